//! User (principal) entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use lifedesk_core::types::{DbId, Timestamp};

/// Constraint names from `20261001000001_create_users_table.sql`.
pub const UQ_USERS_EMAIL: &str = "uq_users_email";
pub const UQ_USERS_USERNAME: &str = "uq_users_username";

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    /// `None` for guest accounts.
    pub password_hash: Option<String>,
    pub display_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_guest: bool,
    pub last_login_at: Option<Timestamp>,
    pub last_seen_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The stored hash, if this principal can log in with a password.
    ///
    /// Guests never have one; a row that violates that invariant is treated
    /// as passwordless.
    pub fn usable_password_hash(&self) -> Option<&str> {
        if self.is_guest {
            return None;
        }
        self.password_hash.as_deref()
    }
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_guest: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role.clone(),
            is_active: user.is_active,
            is_verified: user.is_verified,
            is_guest: user.is_guest,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// DTO for inserting a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub display_name: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub is_guest: bool,
}
