//! Bookmark endpoints. Every operation is scoped to the authenticated member.

use super::{json_body, member_id};
use crate::errors::BookmarkError;
use crate::models::{
    ApiResponse, Bookmark, BookmarkPage, CreateBookmarkRequest, ListBookmarksParams,
    UpdateBookmarkRequest,
};
use crate::routes::AppState;
use crate::services::bookmark_service;
use crate::services::token_service::Principal;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

/// Non-numeric ids cannot name a bookmark.
fn bookmark_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, BookmarkError> {
    path.map(|Path(id)| id)
        .map_err(|_| BookmarkError::NotFound("Bookmark not found".to_string()))
}

/// GET /api/v1/bookmarks?search=&tags=a,b&limit=&offset=
pub async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    params: Result<Query<ListBookmarksParams>, QueryRejection>,
) -> Result<Json<ApiResponse<BookmarkPage>>, BookmarkError> {
    let Query(params) =
        params.map_err(|rejection| BookmarkError::Validation(rejection.body_text()))?;

    let page =
        bookmark_service::list(state.bookmarks.as_ref(), member_id(&principal)?, params).await?;

    Ok(Json(ApiResponse::success("Bookmarks retrieved", page)))
}

/// GET /api/v1/bookmarks/:id
pub async fn get_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<Bookmark>>, BookmarkError> {
    let bookmark = bookmark_service::get(
        state.bookmarks.as_ref(),
        member_id(&principal)?,
        bookmark_id(path)?,
    )
    .await?;

    Ok(Json(ApiResponse::success("Bookmark retrieved", bookmark)))
}

/// POST /api/v1/bookmarks
pub async fn create_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<CreateBookmarkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Bookmark>>), BookmarkError> {
    let member_id = member_id(&principal)?;
    let request = json_body(payload)?;

    let bookmark = bookmark_service::create(state.bookmarks.as_ref(), member_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Bookmark created", bookmark)),
    ))
}

/// PATCH|PUT /api/v1/bookmarks/:id
///
/// Fields left out of the body are unchanged; `"tags": []` clears the tags.
pub async fn update_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateBookmarkRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Bookmark>>, BookmarkError> {
    let member_id = member_id(&principal)?;
    let bookmark_id = bookmark_id(path)?;
    let request = json_body(payload)?;

    let bookmark =
        bookmark_service::update(state.bookmarks.as_ref(), member_id, bookmark_id, request)
            .await?;

    Ok(Json(ApiResponse::success("Bookmark updated", bookmark)))
}

/// DELETE /api/v1/bookmarks/:id
pub async fn delete_bookmark(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, BookmarkError> {
    bookmark_service::remove(
        state.bookmarks.as_ref(),
        member_id(&principal)?,
        bookmark_id(path)?,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
