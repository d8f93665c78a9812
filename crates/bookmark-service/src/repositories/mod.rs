//! Repository layer for the bookmark service.
//!
//! Handlers and services talk to storage through the `MemberRepository` and
//! `BookmarkRepository` traits. `members` and `bookmarks` implement them over
//! PostgreSQL; `memory` implements both in process for tests and local runs.
//!
//! Every bookmark operation takes the owning `member_id` and never touches
//! rows belonging to another member.

pub mod bookmarks;
pub mod members;
pub mod memory;

use crate::errors::BookmarkError;
use crate::models::{
    Bookmark, BookmarkChanges, BookmarkPage, BookmarkQuery, Member, NewBookmark, NewMember,
};

pub use bookmarks::PgBookmarkRepository;
pub use members::PgMemberRepository;
pub use memory::InMemoryStore;

/// Member storage.
#[async_trait::async_trait]
pub trait MemberRepository: Send + Sync {
    /// Insert a member. Returns `BookmarkError::Conflict` if the email is taken.
    async fn create_member(&self, member: NewMember) -> Result<Member, BookmarkError>;

    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, BookmarkError>;

    async fn find_member_by_id(&self, member_id: i64) -> Result<Option<Member>, BookmarkError>;

    /// Delete a member and all their bookmarks. Returns `false` if absent.
    async fn delete_member(&self, member_id: i64) -> Result<bool, BookmarkError>;
}

/// Bookmark storage, scoped by owner.
#[async_trait::async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Newest first, filtered by `query`.
    async fn list_bookmarks(
        &self,
        member_id: i64,
        query: &BookmarkQuery,
    ) -> Result<BookmarkPage, BookmarkError>;

    async fn get_bookmark(
        &self,
        member_id: i64,
        bookmark_id: i64,
    ) -> Result<Option<Bookmark>, BookmarkError>;

    async fn create_bookmark(
        &self,
        member_id: i64,
        bookmark: NewBookmark,
    ) -> Result<Bookmark, BookmarkError>;

    /// Apply `changes`. Returns `None` if the member owns no such bookmark.
    async fn update_bookmark(
        &self,
        member_id: i64,
        bookmark_id: i64,
        changes: BookmarkChanges,
    ) -> Result<Option<Bookmark>, BookmarkError>;

    /// Returns `false` if the member owns no such bookmark.
    async fn delete_bookmark(&self, member_id: i64, bookmark_id: i64)
        -> Result<bool, BookmarkError>;
}
