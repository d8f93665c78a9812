//! Refresh token cookie.
//!
//! The refresh token only ever travels in the `jrt` cookie. It is `HttpOnly`
//! and `Secure`, and `SameSite=None; Partitioned` so a cross-site frontend can
//! send it to the refresh endpoint.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

pub use common::session::REFRESH_COOKIE_NAME;

const COOKIE_ATTRIBUTES: &str = "HttpOnly; Secure; Path=/; SameSite=None; Partitioned";

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// `Set-Cookie` value carrying a refresh token until `expires_at`.
///
/// Returns `None` if the token contains bytes not allowed in a header.
pub fn refresh_cookie(
    token: &str,
    expires_at: DateTime<Utc>,
    max_age_seconds: i64,
) -> Option<HeaderValue> {
    let value = format!(
        "{REFRESH_COOKIE_NAME}={token}; {COOKIE_ATTRIBUTES}; Expires={}; Max-Age={max_age_seconds}",
        expires_at.format(HTTP_DATE_FORMAT)
    );
    HeaderValue::from_str(&value).ok()
}

/// `Set-Cookie` value that makes the browser drop the refresh cookie.
pub fn clear_refresh_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "jrt=; HttpOnly; Secure; Path=/; SameSite=None; Partitioned; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0",
    )
}

/// Value of the named cookie from the request's `Cookie` headers.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
