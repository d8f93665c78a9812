use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::JwtError;
use serde::Serialize;
use thiserror::Error;

/// Authorization gate failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Missing bearer access token")]
    MissingToken,

    #[error(transparent)]
    Token(#[from] JwtError),
}

#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Refresh failed: {0}")]
    RefreshFailed(JwtError),

    #[error("Refresh token missing")]
    RefreshTokenMissing,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Member not found")]
    MemberNotFound,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

const INTERNAL: (StatusCode, &str, &str) = (
    StatusCode::INTERNAL_SERVER_ERROR,
    "INTERNAL_ERROR",
    "An internal error occurred",
);

fn access_token_failure(err: &JwtError) -> (StatusCode, &'static str, &'static str) {
    match err {
        JwtError::Malformed => (
            StatusCode::UNAUTHORIZED,
            "TOKEN_MALFORMED",
            "The access token is malformed",
        ),
        JwtError::SignatureInvalid => (
            StatusCode::UNAUTHORIZED,
            "TOKEN_SIGNATURE_INVALID",
            "The access token signature is invalid",
        ),
        JwtError::IssuerMismatch => (
            StatusCode::UNAUTHORIZED,
            "TOKEN_ISSUER_MISMATCH",
            "The access token was not issued by this service",
        ),
        JwtError::NotYetValid => (
            StatusCode::UNAUTHORIZED,
            "TOKEN_NOT_YET_VALID",
            "The access token is not yet valid",
        ),
        JwtError::Expired => (
            StatusCode::UNAUTHORIZED,
            "TOKEN_EXPIRED",
            "The access token has expired",
        ),
        JwtError::Unexpected(_) => INTERNAL,
    }
}

impl BookmarkError {
    /// Status, stable error code and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        let (status, code, message) = match self {
            BookmarkError::Unauthorized(AuthError::MissingHeader) => (
                StatusCode::UNAUTHORIZED,
                "MISSING_AUTHORIZATION_HEADER",
                "The Authorization header is required",
            ),
            BookmarkError::Unauthorized(AuthError::MissingToken) => (
                StatusCode::UNAUTHORIZED,
                "MISSING_ACCESS_TOKEN",
                "A bearer access token is required",
            ),
            BookmarkError::Unauthorized(AuthError::Token(err)) => access_token_failure(err),
            BookmarkError::RefreshTokenMissing => (
                StatusCode::UNAUTHORIZED,
                "REFRESH_TOKEN_MISSING",
                "The refresh token cookie is missing",
            ),
            BookmarkError::RefreshFailed(JwtError::Expired) => (
                StatusCode::UNAUTHORIZED,
                "REFRESH_TOKEN_EXPIRED",
                "The refresh token has expired",
            ),
            BookmarkError::RefreshFailed(JwtError::Unexpected(_)) => INTERNAL,
            BookmarkError::RefreshFailed(_) => (
                StatusCode::UNAUTHORIZED,
                "REFRESH_TOKEN_INVALID",
                "The refresh token is invalid",
            ),
            BookmarkError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password",
            ),
            BookmarkError::MemberNotFound => (
                StatusCode::NOT_FOUND,
                "MEMBER_NOT_FOUND",
                "Member not found",
            ),
            BookmarkError::NotFound(message) => {
                return (StatusCode::NOT_FOUND, "NOT_FOUND", message.clone())
            }
            BookmarkError::Gone(message) => return (StatusCode::GONE, "GONE", message.clone()),
            BookmarkError::Conflict(message) => {
                return (StatusCode::CONFLICT, "CONFLICT", message.clone())
            }
            BookmarkError::Validation(message) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "VALIDATION_ERROR",
                    message.clone(),
                )
            }
            BookmarkError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "An internal database error occurred",
            ),
            BookmarkError::Internal => INTERNAL,
        };

        (status, code, message.to_string())
    }
}

impl IntoResponse for BookmarkError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(target: "bookmark.errors", error = %self, code = code, "Request failed");
        } else {
            tracing::debug!(target: "bookmark.errors", code = code, status = status.as_u16(), "Request rejected");
        }

        let error_response = ErrorResponse {
            status: false,
            error: ErrorDetail { code, message },
        };

        (status, Json(error_response)).into_response()
    }
}
