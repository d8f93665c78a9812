use chrono::{DateTime, Utc};
use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Member model (maps to member table)
#[derive(Debug, Clone, FromRow)]
pub struct Member {
    pub member_id: i64,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Validated registration data, password already hashed.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
}

/// Public view of a member (no email, no hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberResponse {
    pub member_id: i64,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            member_id: member.member_id,
            nickname: member.nickname,
            created_at: member.created_at,
        }
    }
}

/// Bookmark with its tag names (sorted)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Bookmark {
    pub bookmark_id: i64,
    pub member_id: i64,
    pub title: String,
    pub url: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated bookmark to insert.
#[derive(Debug, Clone)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub tags: Vec<String>,
}

/// Validated partial update. `tags: Some(vec![])` clears all tags.
#[derive(Debug, Clone, Default)]
pub struct BookmarkChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Normalized listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkQuery {
    pub search: Option<String>,
    pub tags: Vec<String>,
    pub limit: i64,
    pub offset: i64,
}

/// One page of a member's bookmarks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkPage {
    pub bookmarks: Vec<Bookmark>,
    pub total_bookmarks_count: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Success envelope: `{"status": true, "message": ..., "data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Access token payload returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterMemberRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub password: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookmarkRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookmarkRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Raw query string for `GET /api/v1/bookmarks`
#[derive(Debug, Default, Deserialize)]
pub struct ListBookmarksParams {
    pub search: Option<String>,
    /// Comma-separated tag names.
    pub tags: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
