//! Repository for the `users` table.

use async_trait::async_trait;
use lifedesk_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::error::DbError;
use crate::models::user::{NewUser, User};
use crate::store::UserStore;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, password_hash, display_name, role, is_active, \
                        is_verified, is_guest, last_login_at, last_seen_at, created_at, updated_at";

/// [`UserStore`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepo {
    async fn ping(&self) -> Result<(), DbError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create(&self, input: &NewUser) -> Result<User, DbError> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, display_name, role, is_verified, is_guest)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.display_name)
            .bind(&input.role)
            .bind(input.is_verified)
            .bind(input.is_guest)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Emails are compared case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn record_login(&self, id: DbId, at: Timestamp) -> Result<(), DbError> {
        sqlx::query("UPDATE users SET last_login_at = $2, last_seen_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch_last_seen(&self, id: DbId, at: Timestamp) -> Result<(), DbError> {
        sqlx::query("UPDATE users SET last_seen_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn deactivate(&self, id: DbId) -> Result<bool, DbError> {
        let result =
            sqlx::query("UPDATE users SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_verified(&self, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE users SET is_verified = true WHERE id = $1 AND is_verified = false",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
