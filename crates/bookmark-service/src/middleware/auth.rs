//! Authorization gate for member routes.
//!
//! `authorize` turns the `Authorization` header into a `Principal`;
//! `require_member_auth` runs it in front of protected handlers and stores the
//! principal in request extensions.

use crate::errors::{AuthError, BookmarkError};
use crate::services::token_service::{Principal, TokenService};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub token_service: Arc<TokenService>,
}

/// Bearer token from the `Authorization` header.
///
/// A header that is absent, not UTF-8, or blank is `MissingHeader`. A header
/// without the `Bearer ` scheme or with nothing after it is `MissingToken`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "bookmark.middleware.auth", "Missing Authorization header");
            AuthError::MissingHeader
        })?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "bookmark.middleware.auth", "No bearer token in Authorization header");
            AuthError::MissingToken
        })
}

/// Resolve the caller's identity from request headers.
///
/// # Errors
///
/// `AuthError::MissingHeader`, `AuthError::MissingToken`, or the token
/// validation failure unchanged.
pub fn authorize(headers: &HeaderMap, token_service: &TokenService) -> Result<Principal, AuthError> {
    let token = extract_bearer_token(headers)?;
    let principal = token_service.validate_access_token(token)?;
    Ok(principal)
}

/// Authentication middleware for member routes.
///
/// # Response
///
/// - Returns 401 Unauthorized with a failure-specific code if the token is
///   missing or invalid
/// - Continues to next handler with `Principal` in extensions if valid
#[instrument(skip_all, name = "bookmark.middleware.auth")]
pub async fn require_member_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, BookmarkError> {
    let principal = authorize(req.headers(), &state.token_service)?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
