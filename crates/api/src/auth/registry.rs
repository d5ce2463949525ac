//! Session registry: revocation and per-user concurrency caps.
//!
//! Each issued access token is registered as a session keyed by the SHA-256
//! digest of the token string. The Access Guard consults [`SessionRegistry::is_valid`]
//! on every authenticated request, which is what makes stateless tokens
//! revocable.
//!
//! No in-process lock is held across store calls. Two logins for the same
//! user racing through [`SessionRegistry::create`] can both count the same
//! live sessions and transiently exceed the cap by the number of racers.

use std::sync::Arc;

use chrono::Duration;
use lifedesk_core::clock::Clock;
use lifedesk_core::types::DbId;
use lifedesk_db::models::session::{NewSession, Session};
use lifedesk_db::{DbError, SessionStore};
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of a token string. This is the session lookup key.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    max_sessions_per_user: usize,
}

impl SessionRegistry {
    /// `max_sessions_per_user` is clamped to at least 1.
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        max_sessions_per_user: usize,
    ) -> Self {
        Self {
            store,
            clock,
            max_sessions_per_user: max_sessions_per_user.max(1),
        }
    }

    pub fn max_sessions_per_user(&self) -> usize {
        self.max_sessions_per_user
    }

    /// Register a session for `token`, evicting the user's oldest live
    /// sessions first so that exactly `max_sessions_per_user` remain live
    /// afterwards.
    pub async fn create(
        &self,
        user_id: DbId,
        token: &str,
        ttl: Duration,
        device_info: Option<String>,
    ) -> Result<Session, DbError> {
        let now = self.clock.now();

        let live = self.store.list_live_for_user(user_id, now).await?;
        let excess = (live.len() + 1).saturating_sub(self.max_sessions_per_user);
        for oldest in live.iter().take(excess) {
            if self.store.deactivate(oldest.id).await? {
                tracing::info!(
                    user_id,
                    session_id = oldest.id,
                    "Evicted oldest session (session limit reached)"
                );
            }
        }

        self.store
            .insert(&NewSession {
                user_id,
                token_hash: hash_token(token),
                device_info,
                expires_at: now + ttl,
                created_at: now,
            })
            .await
    }

    /// `true` iff a session exists for `token`, is active, and `now <= expires_at`.
    pub async fn is_valid(&self, token: &str) -> Result<bool, DbError> {
        let now = self.clock.now();
        Ok(self
            .store
            .find_by_token_hash(&hash_token(token))
            .await?
            .is_some_and(|s| s.is_live(now)))
    }

    /// Deactivate the session for `token`. Returns `false` if there was no
    /// active session; that is not an error.
    pub async fn revoke(&self, token: &str) -> Result<bool, DbError> {
        self.store.deactivate_by_token_hash(&hash_token(token)).await
    }

    /// Deactivate every active session of `user_id`. Returns the count.
    pub async fn revoke_all(&self, user_id: DbId) -> Result<u64, DbError> {
        self.store.deactivate_all_for_user(user_id).await
    }

    /// Live sessions for `user_id`, oldest first.
    pub async fn active_for_user(&self, user_id: DbId) -> Result<Vec<Session>, DbError> {
        self.store.list_live_for_user(user_id, self.clock.now()).await
    }

    /// Delete inactive and expired sessions.
    pub async fn purge_expired(&self) -> Result<u64, DbError> {
        self.store.delete_stale(self.clock.now()).await
    }
}
