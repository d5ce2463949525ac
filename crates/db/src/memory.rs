//! In-process [`UserStore`] and [`SessionStore`] implementations.
//!
//! Used by unit and integration tests in place of PostgreSQL. State lives
//! behind a `std::sync::Mutex` that is never held across an `.await`. With
//! the `test-util` feature, both stores can be switched into an
//! "unavailable" mode to exercise storage-failure paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use lifedesk_core::clock::Clock;
use lifedesk_core::types::{DbId, Timestamp};

use crate::error::DbError;
use crate::models::session::{NewSession, Session};
use crate::models::user::{NewUser, User, UQ_USERS_EMAIL, UQ_USERS_USERNAME};
use crate::store::{SessionStore, UserStore};

const UQ_SESSION_TOKEN_HASH: &str = "uq_user_sessions_token_hash";

/// Shared on/off switch for simulated outages.
#[derive(Debug, Default)]
struct Outage {
    all: AtomicBool,
    last_seen: AtomicBool,
}

impl Outage {
    fn check(&self) -> Result<(), DbError> {
        if self.all.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct UserTable {
    next_id: DbId,
    rows: BTreeMap<DbId, User>,
}

/// In-memory user table.
#[derive(Debug)]
pub struct MemoryUserStore {
    clock: Arc<dyn Clock>,
    table: Mutex<UserTable>,
    outage: Outage,
}

impl MemoryUserStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            table: Mutex::new(UserTable::default()),
            outage: Outage::default(),
        }
    }

    /// Make every operation fail with [`DbError::Unavailable`].
    #[cfg(any(test, feature = "test-util"))]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.outage.all.store(unavailable, Ordering::SeqCst);
    }

    /// Make only [`UserStore::touch_last_seen`] fail.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_last_seen_updates(&self, fail: bool) {
        self.outage.last_seen.store(fail, Ordering::SeqCst);
    }

    fn update<F>(&self, id: DbId, apply: F) -> Result<bool, DbError>
    where
        F: FnOnce(&mut User) -> bool,
    {
        self.outage.check()?;
        let now = self.clock.now();
        let mut table = lock(&self.table);
        Ok(match table.rows.get_mut(&id) {
            Some(user) => {
                let changed = apply(user);
                if changed {
                    user.updated_at = now;
                }
                changed
            }
            None => false,
        })
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn ping(&self) -> Result<(), DbError> {
        self.outage.check()
    }

    async fn create(&self, input: &NewUser) -> Result<User, DbError> {
        self.outage.check()?;
        let now = self.clock.now();
        let mut table = lock(&self.table);

        if table
            .rows
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&input.email))
        {
            return Err(DbError::UniqueViolation {
                constraint: UQ_USERS_EMAIL.into(),
            });
        }
        if table.rows.values().any(|u| u.username == input.username) {
            return Err(DbError::UniqueViolation {
                constraint: UQ_USERS_USERNAME.into(),
            });
        }

        table.next_id += 1;
        let user = User {
            id: table.next_id,
            username: input.username.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            display_name: input.display_name.clone(),
            role: input.role.clone(),
            is_active: true,
            is_verified: input.is_verified,
            is_guest: input.is_guest,
            last_login_at: None,
            last_seen_at: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, DbError> {
        self.outage.check()?;
        Ok(lock(&self.table).rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        self.outage.check()?;
        Ok(lock(&self.table)
            .rows
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        self.outage.check()?;
        Ok(lock(&self.table)
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn record_login(&self, id: DbId, at: Timestamp) -> Result<(), DbError> {
        self.update(id, |u| {
            u.last_login_at = Some(at);
            u.last_seen_at = Some(at);
            true
        })?;
        Ok(())
    }

    async fn touch_last_seen(&self, id: DbId, at: Timestamp) -> Result<(), DbError> {
        if self.outage.last_seen.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("simulated last_seen failure".into()));
        }
        self.update(id, |u| {
            u.last_seen_at = Some(at);
            true
        })?;
        Ok(())
    }

    async fn deactivate(&self, id: DbId) -> Result<bool, DbError> {
        self.update(id, |u| std::mem::replace(&mut u.is_active, false))
    }

    async fn mark_verified(&self, id: DbId) -> Result<bool, DbError> {
        self.update(id, |u| !std::mem::replace(&mut u.is_verified, true))
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SessionTable {
    next_id: DbId,
    rows: BTreeMap<DbId, Session>,
}

/// In-memory session table. Ids increase with insertion order, which is
/// what breaks `created_at` ties.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    table: Mutex<SessionTable>,
    outage: Outage,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with [`DbError::Unavailable`].
    #[cfg(any(test, feature = "test-util"))]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.outage.all.store(unavailable, Ordering::SeqCst);
    }

    /// Number of rows, regardless of state.
    pub fn len(&self) -> usize {
        lock(&self.table).rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, input: &NewSession) -> Result<Session, DbError> {
        self.outage.check()?;
        let mut table = lock(&self.table);
        if table
            .rows
            .values()
            .any(|s| s.token_hash == input.token_hash)
        {
            return Err(DbError::UniqueViolation {
                constraint: UQ_SESSION_TOKEN_HASH.into(),
            });
        }
        table.next_id += 1;
        let session = Session {
            id: table.next_id,
            user_id: input.user_id,
            token_hash: input.token_hash.clone(),
            is_active: true,
            device_info: input.device_info.clone(),
            expires_at: input.expires_at,
            created_at: input.created_at,
        };
        table.rows.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, DbError> {
        self.outage.check()?;
        Ok(lock(&self.table)
            .rows
            .values()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn list_live_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, DbError> {
        self.outage.check()?;
        let mut live: Vec<Session> = lock(&self.table)
            .rows
            .values()
            .filter(|s| s.user_id == user_id && s.is_live(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(live)
    }

    async fn deactivate(&self, id: DbId) -> Result<bool, DbError> {
        self.outage.check()?;
        Ok(match lock(&self.table).rows.get_mut(&id) {
            Some(s) => std::mem::replace(&mut s.is_active, false),
            None => false,
        })
    }

    async fn deactivate_by_token_hash(&self, token_hash: &str) -> Result<bool, DbError> {
        self.outage.check()?;
        Ok(lock(&self.table)
            .rows
            .values_mut()
            .find(|s| s.token_hash == token_hash)
            .map(|s| std::mem::replace(&mut s.is_active, false))
            .unwrap_or(false))
    }

    async fn deactivate_all_for_user(&self, user_id: DbId) -> Result<u64, DbError> {
        self.outage.check()?;
        let mut count = 0;
        for s in lock(&self.table).rows.values_mut() {
            if s.user_id == user_id && s.is_active {
                s.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_stale(&self, now: Timestamp) -> Result<u64, DbError> {
        self.outage.check()?;
        let mut table = lock(&self.table);
        let before = table.rows.len();
        table.rows.retain(|_, s| s.is_active && s.expires_at >= now);
        Ok((before - table.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;
    use lifedesk_core::clock::ManualClock;

    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: Some("$argon2id$stub".into()),
            display_name: None,
            role: "user".into(),
            is_verified: false,
            is_guest: false,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let store = MemoryUserStore::new(Arc::new(ManualClock::starting_now()));
        store.create(&new_user("a", "a@example.com")).await.unwrap();

        let err = store
            .create(&new_user("b", "A@Example.com"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_of(UQ_USERS_EMAIL));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let store = MemoryUserStore::new(Arc::new(ManualClock::starting_now()));
        store.create(&new_user("a", "a@example.com")).await.unwrap();

        let err = store
            .create(&new_user("a", "other@example.com"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_of(UQ_USERS_USERNAME));
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let store = MemoryUserStore::new(Arc::new(ManualClock::starting_now()));
        let user = store.create(&new_user("a", "a@example.com")).await.unwrap();

        assert!(store.deactivate(user.id).await.unwrap());
        assert!(!store.deactivate(user.id).await.unwrap());
        assert!(!store.deactivate(9999).await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryUserStore::new(Arc::new(ManualClock::starting_now()));
        store.set_unavailable(true);
        assert_matches!(store.ping().await, Err(DbError::Unavailable(_)));
        assert_matches!(store.find_by_id(1).await, Err(DbError::Unavailable(_)));
    }

    #[tokio::test]
    async fn live_sessions_are_ordered_oldest_first() {
        let store = MemorySessionStore::new();
        let now = ManualClock::starting_now().now();
        for (hash, offset) in [("b", 10), ("a", 0), ("c", 10)] {
            store
                .insert(&NewSession {
                    user_id: 1,
                    token_hash: hash.into(),
                    device_info: None,
                    expires_at: now + Duration::hours(1),
                    created_at: now + Duration::seconds(offset),
                })
                .await
                .unwrap();
        }

        let live = store.list_live_for_user(1, now).await.unwrap();
        let hashes: Vec<_> = live.iter().map(|s| s.token_hash.as_str()).collect();
        assert_eq!(hashes, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn delete_stale_keeps_only_live_rows() {
        let store = MemorySessionStore::new();
        let now = ManualClock::starting_now().now();
        let mk = |hash: &str, expires_at| NewSession {
            user_id: 1,
            token_hash: hash.into(),
            device_info: None,
            expires_at,
            created_at: now,
        };
        store.insert(&mk("live", now + Duration::hours(1))).await.unwrap();
        store.insert(&mk("expired", now - Duration::seconds(1))).await.unwrap();
        let revoked = store.insert(&mk("revoked", now + Duration::hours(1))).await.unwrap();
        store.deactivate(revoked.id).await.unwrap();

        assert_eq!(store.delete_stale(now).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.find_by_token_hash("live").await.unwrap().is_some());
    }
}
