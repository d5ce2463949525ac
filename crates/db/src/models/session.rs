//! Session model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use lifedesk_core::types::{DbId, Timestamp};

/// A session row from the `user_sessions` table.
///
/// Binds one issued access token (stored as its SHA-256 digest) to a user.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub token_hash: String,
    pub is_active: bool,
    pub device_info: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl Session {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Active and not yet expired.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

/// DTO for inserting a new session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: DbId,
    pub token_hash: String,
    pub device_info: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// Session info safe to return to the owning user.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: DbId,
    pub device_info: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            device_info: session.device_info.clone(),
            expires_at: session.expires_at,
            created_at: session.created_at,
        }
    }
}
