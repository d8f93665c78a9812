//! Bookmark validation and owner-scoped CRUD.

use crate::errors::BookmarkError;
use crate::models::{
    Bookmark, BookmarkChanges, BookmarkPage, BookmarkQuery, CreateBookmarkRequest,
    ListBookmarksParams, NewBookmark, UpdateBookmarkRequest,
};
use crate::repositories::BookmarkRepository;
use std::collections::HashSet;
use tracing::instrument;

pub const MAX_TITLE_BYTES: usize = 150;
pub const MAX_URL_BYTES: usize = 2083;
pub const MAX_TAG_BYTES: usize = 50;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

fn validate_title(title: &str) -> Result<(), BookmarkError> {
    if title.trim().is_empty() || title.len() > MAX_TITLE_BYTES {
        return Err(BookmarkError::Validation(
            "Title must be a non-empty string of 150 characters or less".to_string(),
        ));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), BookmarkError> {
    if url.trim().is_empty() || url.len() > MAX_URL_BYTES {
        return Err(BookmarkError::Validation("URL must be a valid URL".to_string()));
    }
    Ok(())
}

/// Tags must be non-empty, untrimmed-equal and unique. Returned sorted.
fn validate_tags(mut tags: Vec<String>) -> Result<Vec<String>, BookmarkError> {
    let mut seen = HashSet::with_capacity(tags.len());

    for tag in &tags {
        if tag.is_empty() || tag.trim() != tag || tag.len() > MAX_TAG_BYTES {
            return Err(BookmarkError::Validation(
                "Tag names must be non-empty strings of 50 characters or less without surrounding whitespace"
                    .to_string(),
            ));
        }
        if !seen.insert(tag.as_str()) {
            return Err(BookmarkError::Validation(
                "Duplicate tag names are not allowed".to_string(),
            ));
        }
    }

    tags.sort_unstable();
    Ok(tags)
}

/// Validate a create request.
///
/// # Errors
///
/// Returns `BookmarkError::Validation` naming the first invalid field.
pub fn validate_new(request: CreateBookmarkRequest) -> Result<NewBookmark, BookmarkError> {
    validate_title(&request.title)?;
    validate_url(&request.url)?;
    let tags = validate_tags(request.tags.unwrap_or_default())?;

    Ok(NewBookmark {
        title: request.title,
        url: request.url,
        tags,
    })
}

/// Validate a partial update. Absent fields are left unchanged.
///
/// # Errors
///
/// Returns `BookmarkError::Validation` naming the first invalid field.
pub fn validate_changes(request: UpdateBookmarkRequest) -> Result<BookmarkChanges, BookmarkError> {
    if let Some(title) = &request.title {
        validate_title(title)?;
    }
    if let Some(url) = &request.url {
        validate_url(url)?;
    }
    let tags = request.tags.map(validate_tags).transpose()?;

    Ok(BookmarkChanges {
        title: request.title,
        url: request.url,
        tags,
    })
}

/// Turn raw query parameters into a listing query.
///
/// A missing or zero limit means the default; larger limits are capped.
///
/// # Errors
///
/// Returns `BookmarkError::Validation` for a negative limit or offset.
pub fn normalize_query(params: ListBookmarksParams) -> Result<BookmarkQuery, BookmarkError> {
    let limit = match params.limit {
        None | Some(0) => DEFAULT_PAGE_LIMIT,
        Some(limit) if limit < 0 => {
            return Err(BookmarkError::Validation(
                "Limit must be a non-negative integer".to_string(),
            ))
        }
        Some(limit) => limit.min(MAX_PAGE_LIMIT),
    };

    let offset = params.offset.unwrap_or(0);
    if offset < 0 {
        return Err(BookmarkError::Validation(
            "Offset must be a non-negative integer".to_string(),
        ));
    }

    let search = params
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let tags = params
        .tags
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(BookmarkQuery {
        search,
        tags,
        limit,
        offset,
    })
}

/// # Errors
///
/// Validation failures and storage errors.
pub async fn list(
    bookmarks: &dyn BookmarkRepository,
    member_id: i64,
    params: ListBookmarksParams,
) -> Result<BookmarkPage, BookmarkError> {
    let query = normalize_query(params)?;
    bookmarks.list_bookmarks(member_id, &query).await
}

/// # Errors
///
/// Returns `BookmarkError::NotFound` unless `member_id` owns the bookmark.
pub async fn get(
    bookmarks: &dyn BookmarkRepository,
    member_id: i64,
    bookmark_id: i64,
) -> Result<Bookmark, BookmarkError> {
    bookmarks
        .get_bookmark(member_id, bookmark_id)
        .await?
        .ok_or_else(not_found)
}

/// # Errors
///
/// Validation failures and storage errors.
#[instrument(skip_all)]
pub async fn create(
    bookmarks: &dyn BookmarkRepository,
    member_id: i64,
    request: CreateBookmarkRequest,
) -> Result<Bookmark, BookmarkError> {
    let bookmark = bookmarks
        .create_bookmark(member_id, validate_new(request)?)
        .await?;

    tracing::debug!(
        target: "bookmark.bookmarks",
        member_id = member_id,
        bookmark_id = bookmark.bookmark_id,
        "Bookmark created"
    );
    Ok(bookmark)
}

/// # Errors
///
/// Validation failures, or `BookmarkError::NotFound` unless `member_id` owns
/// the bookmark.
#[instrument(skip_all)]
pub async fn update(
    bookmarks: &dyn BookmarkRepository,
    member_id: i64,
    bookmark_id: i64,
    request: UpdateBookmarkRequest,
) -> Result<Bookmark, BookmarkError> {
    let changes = validate_changes(request)?;
    bookmarks
        .update_bookmark(member_id, bookmark_id, changes)
        .await?
        .ok_or_else(not_found)
}

/// # Errors
///
/// Returns `BookmarkError::NotFound` unless `member_id` owns the bookmark.
#[instrument(skip_all)]
pub async fn remove(
    bookmarks: &dyn BookmarkRepository,
    member_id: i64,
    bookmark_id: i64,
) -> Result<(), BookmarkError> {
    if !bookmarks.delete_bookmark(member_id, bookmark_id).await? {
        return Err(not_found());
    }

    tracing::debug!(
        target: "bookmark.bookmarks",
        member_id = member_id,
        bookmark_id = bookmark_id,
        "Bookmark deleted"
    );
    Ok(())
}

fn not_found() -> BookmarkError {
    BookmarkError::NotFound("Bookmark not found".to_string())
}
