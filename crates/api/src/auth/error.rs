//! Authentication failure kinds.
//!
//! These never reach clients as-is: [`crate::error::AppError`] maps each one
//! to a status code and a deliberately generic message.

use lifedesk_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password. The two cases are indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("Username is already taken")]
    DuplicateUsername,

    /// Malformed token or bad signature.
    #[error("Invalid token")]
    InvalidToken,

    /// Signature valid, `exp` in the past.
    #[error("Token has expired")]
    ExpiredToken,

    /// The `type` claim does not match what the operation expects.
    #[error("Wrong token type")]
    InvalidTokenType,

    /// The token is otherwise valid but its session is inactive or absent.
    #[error("Session has been revoked")]
    SessionRevoked,

    #[error("Account is not verified")]
    NotVerified,

    /// Authenticated, but lacking the required role or permission.
    #[error("Insufficient privileges: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Failures that mean "these credentials do not identify anyone right
    /// now". Optional routes downgrade these to anonymous.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AccountDeactivated
                | AuthError::InvalidToken
                | AuthError::ExpiredToken
                | AuthError::InvalidTokenType
                | AuthError::SessionRevoked
        )
    }
}
