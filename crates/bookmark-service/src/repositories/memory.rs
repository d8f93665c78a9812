//! In-process store implementing both repository traits.
//!
//! Used by the test harness and for running the service without PostgreSQL.
//! Semantics match the PostgreSQL repositories: emails are unique, deleting a
//! member removes their bookmarks, tag names are kept sorted per bookmark, and
//! listing is newest first.

use super::{BookmarkRepository, MemberRepository};
use crate::errors::BookmarkError;
use crate::models::{
    Bookmark, BookmarkChanges, BookmarkPage, BookmarkQuery, Member, NewBookmark, NewMember,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
struct State {
    last_member_id: i64,
    last_bookmark_id: i64,
    members: BTreeMap<i64, Member>,
    bookmarks: BTreeMap<i64, Bookmark>,
}

/// Shared in-memory members and bookmarks.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bookmarks across all members.
    pub fn bookmark_count(&self) -> usize {
        self.state.lock().bookmarks.len()
    }
}

fn sorted_unique(mut tags: Vec<String>) -> Vec<String> {
    tags.sort();
    tags.dedup();
    tags
}

fn matches_query(bookmark: &Bookmark, query: &BookmarkQuery) -> bool {
    let search_matches = query.search.as_ref().map_or(true, |search| {
        bookmark
            .title
            .to_lowercase()
            .contains(&search.to_lowercase())
    });

    let tags_match = query.tags.is_empty() || bookmark.tags.iter().any(|t| query.tags.contains(t));

    search_matches && tags_match
}

#[async_trait::async_trait]
impl MemberRepository for InMemoryStore {
    async fn create_member(&self, member: NewMember) -> Result<Member, BookmarkError> {
        let mut state = self.state.lock();

        if state.members.values().any(|m| m.email == member.email) {
            return Err(BookmarkError::Conflict(
                "Email is already registered".to_string(),
            ));
        }

        state.last_member_id += 1;
        let created = Member {
            member_id: state.last_member_id,
            email: member.email,
            nickname: member.nickname,
            password_hash: member.password_hash,
            created_at: Utc::now(),
        };
        state.members.insert(created.member_id, created.clone());

        Ok(created)
    }

    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, BookmarkError> {
        Ok(self
            .state
            .lock()
            .members
            .values()
            .find(|m| m.email == email)
            .cloned())
    }

    async fn find_member_by_id(&self, member_id: i64) -> Result<Option<Member>, BookmarkError> {
        Ok(self.state.lock().members.get(&member_id).cloned())
    }

    async fn delete_member(&self, member_id: i64) -> Result<bool, BookmarkError> {
        let mut state = self.state.lock();

        if state.members.remove(&member_id).is_none() {
            return Ok(false);
        }
        state.bookmarks.retain(|_, b| b.member_id != member_id);

        Ok(true)
    }
}

#[async_trait::async_trait]
impl BookmarkRepository for InMemoryStore {
    async fn list_bookmarks(
        &self,
        member_id: i64,
        query: &BookmarkQuery,
    ) -> Result<BookmarkPage, BookmarkError> {
        let state = self.state.lock();

        let mut matching: Vec<&Bookmark> = state
            .bookmarks
            .values()
            .filter(|b| b.member_id == member_id && matches_query(b, query))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.bookmark_id.cmp(&a.bookmark_id))
        });

        let total_bookmarks_count = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let skip = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(query.limit).unwrap_or(0);

        let bookmarks = matching
            .into_iter()
            .skip(skip)
            .take(take)
            .cloned()
            .collect();

        Ok(BookmarkPage {
            bookmarks,
            total_bookmarks_count,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn get_bookmark(
        &self,
        member_id: i64,
        bookmark_id: i64,
    ) -> Result<Option<Bookmark>, BookmarkError> {
        Ok(self
            .state
            .lock()
            .bookmarks
            .get(&bookmark_id)
            .filter(|b| b.member_id == member_id)
            .cloned())
    }

    async fn create_bookmark(
        &self,
        member_id: i64,
        bookmark: NewBookmark,
    ) -> Result<Bookmark, BookmarkError> {
        let mut state = self.state.lock();

        if !state.members.contains_key(&member_id) {
            return Err(BookmarkError::Database(format!(
                "Failed to create bookmark: no member {}",
                member_id
            )));
        }

        state.last_bookmark_id += 1;
        let now = Utc::now();
        let created = Bookmark {
            bookmark_id: state.last_bookmark_id,
            member_id,
            title: bookmark.title,
            url: bookmark.url,
            tags: sorted_unique(bookmark.tags),
            created_at: now,
            updated_at: now,
        };
        state.bookmarks.insert(created.bookmark_id, created.clone());

        Ok(created)
    }

    async fn update_bookmark(
        &self,
        member_id: i64,
        bookmark_id: i64,
        changes: BookmarkChanges,
    ) -> Result<Option<Bookmark>, BookmarkError> {
        let mut state = self.state.lock();

        let Some(bookmark) = state
            .bookmarks
            .get_mut(&bookmark_id)
            .filter(|b| b.member_id == member_id)
        else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            bookmark.title = title;
        }
        if let Some(url) = changes.url {
            bookmark.url = url;
        }
        if let Some(tags) = changes.tags {
            bookmark.tags = sorted_unique(tags);
        }
        bookmark.updated_at = Utc::now();

        Ok(Some(bookmark.clone()))
    }

    async fn delete_bookmark(
        &self,
        member_id: i64,
        bookmark_id: i64,
    ) -> Result<bool, BookmarkError> {
        let mut state = self.state.lock();

        let owned = state
            .bookmarks
            .get(&bookmark_id)
            .is_some_and(|b| b.member_id == member_id);
        if owned {
            state.bookmarks.remove(&bookmark_id);
        }

        Ok(owned)
    }
}
