//! Argon2id password hashing and verification.
//!
//! Hashes use the Argon2id variant with a random salt from [`OsRng`] and are
//! stored in PHC string format, so parameters and salt travel with the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::auth::error::AuthError;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Hash a plaintext password. Returns the PHC-formatted hash string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Password hashing error: {e}")))
}

/// Check `password` against a stored hash.
///
/// A missing hash (guest account) never matches. A stored hash that cannot
/// be parsed is an internal error, not a mismatch.
pub fn verify_password(password: &str, hash: Option<&str>) -> Result<bool, AuthError> {
    let Some(hash) = hash else {
        return Ok(false);
    };
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::Internal(format!("Stored password hash is malformed: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Internal(format!(
            "Password verification error: {e}"
        ))),
    }
}

/// Reject passwords shorter than [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password_strength(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct-horse").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"), "expected argon2id PHC prefix");

        assert!(verify_password("correct-horse", Some(&hash)).unwrap());
        assert!(!verify_password("wrong-horse", Some(&hash)).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("pw123").unwrap();
        let b = hash_password("pw123").unwrap();
        assert_ne!(a, b, "salts must differ");
    }

    #[test]
    fn missing_hash_never_matches() {
        assert!(!verify_password("", None).unwrap());
        assert!(!verify_password("anything", None).unwrap());
    }

    #[test]
    fn malformed_hash_is_internal_error() {
        assert_matches!(
            verify_password("pw", Some("not-a-phc-string")),
            Err(AuthError::Internal(_))
        );
    }

    #[test]
    fn strength_boundary() {
        assert_matches!(validate_password_strength("pw12"), Err(AuthError::Validation(_)));
        assert!(validate_password_strength("pw123").is_ok());
    }
}
