//! Repository for the `user_sessions` table.

use async_trait::async_trait;
use lifedesk_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::error::DbError;
use crate::models::session::{NewSession, Session};
use crate::store::SessionStore;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token_hash, is_active, device_info, expires_at, created_at";

/// [`SessionStore`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct SessionRepo {
    pool: PgPool,
}

impl SessionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepo {
    async fn insert(&self, input: &NewSession) -> Result<Session, DbError> {
        let query = format!(
            "INSERT INTO user_sessions (user_id, token_hash, device_info, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, Session>(&query)
            .bind(input.user_id)
            .bind(&input.token_hash)
            .bind(&input.device_info)
            .bind(input.expires_at)
            .bind(input.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(session)
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE token_hash = $1");
        let session = sqlx::query_as::<_, Session>(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn list_live_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, DbError> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE user_id = $1
               AND is_active = true
               AND expires_at >= $2
             ORDER BY created_at ASC, id ASC"
        );
        let sessions = sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(sessions)
    }

    async fn deactivate(&self, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = false WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_by_token_hash(&self, token_hash: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = false
             WHERE token_hash = $1 AND is_active = true",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all_for_user(&self, user_id: DbId) -> Result<u64, DbError> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_active = false
             WHERE user_id = $1 AND is_active = true",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_stale(&self, now: Timestamp) -> Result<u64, DbError> {
        let result =
            sqlx::query("DELETE FROM user_sessions WHERE expires_at < $1 OR is_active = false")
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
