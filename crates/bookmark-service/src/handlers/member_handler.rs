use super::{json_body, member_id};
use crate::errors::BookmarkError;
use crate::models::{ApiResponse, MemberResponse, RegisterMemberRequest};
use crate::routes::AppState;
use crate::services::member_service;
use crate::services::token_service::Principal;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handle member registration
///
/// POST /api/v1/members
#[instrument(skip_all, name = "bookmark.members.register")]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterMemberRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<MemberResponse>>), BookmarkError> {
    let request = json_body(payload)?;

    let member =
        member_service::register(state.members.as_ref(), request, state.config.bcrypt_cost)
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Member created successfully.",
            MemberResponse::from(member),
        )),
    ))
}

/// GET /api/v1/members/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<MemberResponse>>, BookmarkError> {
    let member = member_service::get(state.members.as_ref(), member_id(&principal)?).await?;

    Ok(Json(ApiResponse::success(
        "Member found.",
        MemberResponse::from(member),
    )))
}

/// DELETE /api/v1/members/me
///
/// Removes the member with all their bookmarks and tags.
#[instrument(skip_all, name = "bookmark.members.delete")]
pub async fn delete_me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<StatusCode, BookmarkError> {
    member_service::remove(state.members.as_ref(), member_id(&principal)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
