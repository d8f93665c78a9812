//! PostgreSQL member repository.

use super::MemberRepository;
use crate::errors::BookmarkError;
use crate::models::{Member, NewMember};
use sqlx::PgPool;

pub struct PgMemberRepository {
    pool: PgPool,
}

impl PgMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MemberRepository for PgMemberRepository {
    async fn create_member(&self, member: NewMember) -> Result<Member, BookmarkError> {
        sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO member (email, nickname, password_hash)
            VALUES ($1, $2, $3)
            RETURNING member_id, email, nickname, password_hash, created_at
            "#,
        )
        .bind(&member.email)
        .bind(&member.nickname)
        .bind(&member.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                BookmarkError::Conflict("Email is already registered".to_string())
            }
            e => BookmarkError::Database(format!("Failed to create member: {}", e)),
        })
    }

    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, BookmarkError> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT member_id, email, nickname, password_hash, created_at
            FROM member
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookmarkError::Database(format!("Failed to fetch member by email: {}", e)))
    }

    async fn find_member_by_id(&self, member_id: i64) -> Result<Option<Member>, BookmarkError> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT member_id, email, nickname, password_hash, created_at
            FROM member
            WHERE member_id = $1
            "#,
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookmarkError::Database(format!("Failed to fetch member by id: {}", e)))
    }

    /// Bookmarks and tags go with the member through `ON DELETE CASCADE`.
    async fn delete_member(&self, member_id: i64) -> Result<bool, BookmarkError> {
        let result = sqlx::query("DELETE FROM member WHERE member_id = $1")
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(|e| BookmarkError::Database(format!("Failed to delete member: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
