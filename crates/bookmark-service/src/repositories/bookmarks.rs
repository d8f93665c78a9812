//! PostgreSQL bookmark repository.
//!
//! Tags live in `tag` (unique per member and name) and are linked through
//! `bookmark_tag`. Tags no longer linked to any bookmark are deleted after
//! every update and delete.

use super::BookmarkRepository;
use crate::errors::BookmarkError;
use crate::models::{Bookmark, BookmarkChanges, BookmarkPage, BookmarkQuery, NewBookmark};
use sqlx::{PgPool, Postgres, Transaction};

const SELECT_BOOKMARK: &str = r#"
    SELECT
        b.bookmark_id, b.member_id, b.title, b.url, b.created_at, b.updated_at,
        COALESCE(
            ARRAY_AGG(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL),
            ARRAY[]::TEXT[]
        ) AS tags
    FROM bookmark b
    LEFT JOIN bookmark_tag bt ON bt.bookmark_id = b.bookmark_id
    LEFT JOIN tag t ON t.tag_id = bt.tag_id
"#;

/// Listing filter: $1 member, $2 title search pattern (or NULL), $3 tag names.
const LIST_FILTER: &str = r#"
    WHERE b.member_id = $1
      AND ($2::TEXT IS NULL OR b.title ILIKE $2 ESCAPE '\')
      AND (
          CARDINALITY($3::TEXT[]) = 0
          OR EXISTS (
              SELECT 1
              FROM bookmark_tag fbt
              JOIN tag ft ON ft.tag_id = fbt.tag_id
              WHERE fbt.bookmark_id = b.bookmark_id AND ft.name = ANY($3)
          )
      )
"#;

pub struct PgBookmarkRepository {
    pool: PgPool,
}

impl PgBookmarkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, member_id: i64, bookmark_id: i64) -> Result<Option<Bookmark>, BookmarkError> {
        sqlx::query_as::<_, Bookmark>(&format!(
            "{SELECT_BOOKMARK} WHERE b.member_id = $1 AND b.bookmark_id = $2 GROUP BY b.bookmark_id"
        ))
        .bind(member_id)
        .bind(bookmark_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookmarkError::Database(format!("Failed to fetch bookmark: {}", e)))
    }
}

/// Escape `%`, `_` and `\` and wrap in wildcards for a substring `ILIKE`.
fn substring_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

async fn link_tags(
    tx: &mut Transaction<'_, Postgres>,
    member_id: i64,
    bookmark_id: i64,
    tags: &[String],
) -> Result<(), BookmarkError> {
    if tags.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO tag (member_id, name)
        SELECT $1, UNNEST($2::TEXT[])
        ON CONFLICT (member_id, name) DO NOTHING
        "#,
    )
    .bind(member_id)
    .bind(tags)
    .execute(&mut **tx)
    .await
    .map_err(|e| BookmarkError::Database(format!("Failed to upsert tags: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO bookmark_tag (bookmark_id, tag_id)
        SELECT $1, tag_id FROM tag WHERE member_id = $2 AND name = ANY($3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(bookmark_id)
    .bind(member_id)
    .bind(tags)
    .execute(&mut **tx)
    .await
    .map_err(|e| BookmarkError::Database(format!("Failed to link tags: {}", e)))?;

    Ok(())
}

async fn delete_orphaned_tags(
    tx: &mut Transaction<'_, Postgres>,
    member_id: i64,
) -> Result<(), BookmarkError> {
    sqlx::query(
        r#"
        DELETE FROM tag
        WHERE member_id = $1
          AND NOT EXISTS (SELECT 1 FROM bookmark_tag bt WHERE bt.tag_id = tag.tag_id)
        "#,
    )
    .bind(member_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| BookmarkError::Database(format!("Failed to delete orphaned tags: {}", e)))?;

    Ok(())
}

#[async_trait::async_trait]
impl BookmarkRepository for PgBookmarkRepository {
    async fn list_bookmarks(
        &self,
        member_id: i64,
        query: &BookmarkQuery,
    ) -> Result<BookmarkPage, BookmarkError> {
        let search = query.search.as_deref().map(substring_pattern);

        let total_bookmarks_count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM bookmark b {LIST_FILTER}"))
                .bind(member_id)
                .bind(&search)
                .bind(&query.tags)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| BookmarkError::Database(format!("Failed to count bookmarks: {}", e)))?;

        let bookmarks = sqlx::query_as::<_, Bookmark>(&format!(
            r#"
            {SELECT_BOOKMARK}
            {LIST_FILTER}
            GROUP BY b.bookmark_id
            ORDER BY b.created_at DESC, b.bookmark_id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(member_id)
        .bind(&search)
        .bind(&query.tags)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BookmarkError::Database(format!("Failed to list bookmarks: {}", e)))?;

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
        self.fetch(member_id, bookmark_id).await
    }

    async fn create_bookmark(
        &self,
        member_id: i64,
        bookmark: NewBookmark,
    ) -> Result<Bookmark, BookmarkError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BookmarkError::Database(format!("Failed to begin transaction: {}", e)))?;

        let bookmark_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bookmark (member_id, title, url)
            VALUES ($1, $2, $3)
            RETURNING bookmark_id
            "#,
        )
        .bind(member_id)
        .bind(&bookmark.title)
        .bind(&bookmark.url)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| BookmarkError::Database(format!("Failed to create bookmark: {}", e)))?;

        link_tags(&mut tx, member_id, bookmark_id, &bookmark.tags).await?;

        tx.commit()
            .await
            .map_err(|e| BookmarkError::Database(format!("Failed to commit bookmark: {}", e)))?;

        self.fetch(member_id, bookmark_id)
            .await?
            .ok_or_else(|| BookmarkError::Database("Created bookmark not found".to_string()))
    }

    async fn update_bookmark(
        &self,
        member_id: i64,
        bookmark_id: i64,
        changes: BookmarkChanges,
    ) -> Result<Option<Bookmark>, BookmarkError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BookmarkError::Database(format!("Failed to begin transaction: {}", e)))?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE bookmark
            SET title = COALESCE($3, title),
                url = COALESCE($4, url),
                updated_at = NOW()
            WHERE member_id = $1 AND bookmark_id = $2
            RETURNING bookmark_id
            "#,
        )
        .bind(member_id)
        .bind(bookmark_id)
        .bind(&changes.title)
        .bind(&changes.url)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| BookmarkError::Database(format!("Failed to update bookmark: {}", e)))?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(tags) = &changes.tags {
            sqlx::query("DELETE FROM bookmark_tag WHERE bookmark_id = $1")
                .bind(bookmark_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| BookmarkError::Database(format!("Failed to unlink tags: {}", e)))?;

            link_tags(&mut tx, member_id, bookmark_id, tags).await?;
            delete_orphaned_tags(&mut tx, member_id).await?;
        }

        tx.commit()
            .await
            .map_err(|e| BookmarkError::Database(format!("Failed to commit bookmark: {}", e)))?;

        self.fetch(member_id, bookmark_id).await
    }

    async fn delete_bookmark(
        &self,
        member_id: i64,
        bookmark_id: i64,
    ) -> Result<bool, BookmarkError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BookmarkError::Database(format!("Failed to begin transaction: {}", e)))?;

        let result = sqlx::query("DELETE FROM bookmark WHERE member_id = $1 AND bookmark_id = $2")
            .bind(member_id)
            .bind(bookmark_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| BookmarkError::Database(format!("Failed to delete bookmark: {}", e)))?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        delete_orphaned_tags(&mut tx, member_id).await?;

        tx.commit()
            .await
            .map_err(|e| BookmarkError::Database(format!("Failed to commit delete: {}", e)))?;

        Ok(true)
    }
}
