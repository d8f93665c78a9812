use super::json_body;
use crate::cookies::{clear_refresh_cookie, extract_cookie, refresh_cookie, REFRESH_COOKIE_NAME};
use crate::errors::BookmarkError;
use crate::models::{ApiResponse, LoginRequest, TokenResponse};
use crate::routes::AppState;
use crate::services::member_service;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use common::jwt::JwtError;
use std::sync::Arc;
use tracing::instrument;

/// Handle login
///
/// POST /api/v1/auth/login
///
/// Returns the access token in the body and sets the `jrt` refresh cookie.
#[instrument(skip_all, name = "bookmark.auth.login")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, BookmarkError> {
    let request = json_body(payload)?;

    let member = member_service::authenticate(
        state.members.as_ref(),
        &request.email,
        request.password.as_ref(),
    )
    .await?;

    let subject = member.member_id.to_string();
    let access_token = state
        .token_service
        .issue_access_token(&subject)
        .map_err(issuing_failed)?;
    let refresh_token = state
        .token_service
        .issue_refresh_token(&subject)
        .map_err(issuing_failed)?;

    token_response(
        &state,
        "Login successful",
        access_token,
        &refresh_token.token,
        refresh_token.expires_at,
    )
}

/// Handle refresh
///
/// POST /api/v1/auth/refresh
///
/// Exchanges the `jrt` cookie for a new access token and a rotated cookie.
#[instrument(skip_all, name = "bookmark.auth.refresh")]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, BookmarkError> {
    let refresh_token = extract_cookie(&headers, REFRESH_COOKIE_NAME)
        .ok_or(BookmarkError::RefreshTokenMissing)?;

    let rotated = match state.token_service.rotate(&refresh_token) {
        Ok(rotated) => rotated,
        Err(err @ JwtError::Unexpected(_)) => return Err(BookmarkError::RefreshFailed(err)),
        Err(err) => {
            // Expired or invalid: drop the cookie along with the 401.
            return Ok((
                [(header::SET_COOKIE, clear_refresh_cookie())],
                BookmarkError::RefreshFailed(err),
            )
                .into_response());
        }
    };

    token_response(
        &state,
        "Token refreshed",
        rotated.access_token,
        &rotated.refresh_token,
        rotated.expires_at,
    )
}

/// Handle logout
///
/// POST /api/v1/auth/logout
///
/// Always succeeds; expires the `jrt` cookie.
pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, clear_refresh_cookie())],
        Json(ApiResponse::message("Logout successful")),
    )
        .into_response()
}

fn token_response(
    state: &AppState,
    message: &str,
    access_token: String,
    refresh_token: &str,
    refresh_expires_at: DateTime<Utc>,
) -> Result<Response, BookmarkError> {
    let cookie = refresh_cookie(
        refresh_token,
        refresh_expires_at,
        state.token_service.refresh_token_lifetime(),
    )
    .ok_or_else(|| {
        tracing::error!(target: "bookmark.auth", "Refresh token is not a valid cookie value");
        BookmarkError::Internal
    })?;

    let body = ApiResponse::success(
        message,
        TokenResponse::bearer(access_token, state.token_service.access_token_lifetime()),
    );

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

fn issuing_failed(err: JwtError) -> BookmarkError {
    tracing::error!(target: "bookmark.auth", error = %err, "Failed to sign token");
    BookmarkError::Internal
}
