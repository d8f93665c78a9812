//! HTTP request handlers.

pub mod auth_handler;
pub mod bookmark_handler;
pub mod health;
pub mod member_handler;
pub mod metrics;

pub use auth_handler::{login, logout, refresh};
pub use bookmark_handler::{
    create_bookmark, delete_bookmark, get_bookmark, list_bookmarks, update_bookmark,
};
pub use health::health_check;
pub use member_handler::{delete_me, get_me, register};
pub use metrics::metrics_handler;

use crate::errors::{AuthError, BookmarkError};
use crate::services::token_service::Principal;
use axum::extract::rejection::JsonRejection;
use axum::Json;

/// Unwrap a JSON body, turning any rejection into a 422.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, BookmarkError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| BookmarkError::Validation(rejection.body_text()))
}

/// Member id of the authenticated caller.
fn member_id(principal: &Principal) -> Result<i64, BookmarkError> {
    principal
        .member_id()
        .map_err(|err| BookmarkError::Unauthorized(AuthError::Token(err)))
}
