//! Authentication and session lifecycle.
//!
//! - [`jwt`] -- signed, time-bounded access/refresh token codec.
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`registry`] -- session registry: revocation and per-user session caps.
//! - [`authenticator`] -- registration, login, guest accounts, refresh, logout.
//! - [`error`] -- the authentication error taxonomy.

pub mod authenticator;
pub mod error;
pub mod jwt;
pub mod password;
pub mod registry;

pub use authenticator::Authenticator;
pub use error::AuthError;
pub use jwt::{Claims, TokenCodec, TokenType};
pub use registry::SessionRegistry;
