//! Storage seams used by the authentication layer.
//!
//! The API server only talks to these traits. [`crate::repositories`]
//! implements them on PostgreSQL and [`crate::memory`] implements them
//! in-process. Implementations report "not found" through `Option` / `bool`
//! return values and reserve `Err` for storage failures.

use async_trait::async_trait;
use lifedesk_core::types::{DbId, Timestamp};

use crate::error::DbError;
use crate::models::session::{NewSession, Session};
use crate::models::user::{NewUser, User};

/// Persisted principals.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Confirm the backing store is reachable.
    async fn ping(&self) -> Result<(), DbError>;

    /// Insert a new user. Fails with [`DbError::UniqueViolation`] on a
    /// duplicate email or username.
    async fn create(&self, input: &NewUser) -> Result<User, DbError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, DbError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DbError>;

    /// Set `last_login_at`.
    async fn record_login(&self, id: DbId, at: Timestamp) -> Result<(), DbError>;

    /// Set `last_seen_at`.
    async fn touch_last_seen(&self, id: DbId, at: Timestamp) -> Result<(), DbError>;

    /// Set `is_active = false`. Returns `true` if the row changed.
    async fn deactivate(&self, id: DbId) -> Result<bool, DbError>;

    /// Set `is_verified = true`. Returns `true` if the row changed.
    async fn mark_verified(&self, id: DbId) -> Result<bool, DbError>;
}

/// Persisted sessions, keyed by token digest.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, input: &NewSession) -> Result<Session, DbError>;

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, DbError>;

    /// Active, unexpired sessions for a user, oldest first (ties broken by id).
    async fn list_live_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, DbError>;

    /// Deactivate a session by id. Returns `true` if the row changed.
    async fn deactivate(&self, id: DbId) -> Result<bool, DbError>;

    /// Deactivate a session by token digest. Returns `true` if the row changed.
    async fn deactivate_by_token_hash(&self, token_hash: &str) -> Result<bool, DbError>;

    /// Deactivate every active session of a user. Returns the count changed.
    async fn deactivate_all_for_user(&self, user_id: DbId) -> Result<u64, DbError>;

    /// Delete sessions that are inactive or expired as of `now`.
    async fn delete_stale(&self, now: Timestamp) -> Result<u64, DbError>;
}
