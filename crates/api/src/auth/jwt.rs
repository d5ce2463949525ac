//! Signed, time-bounded token codec.
//!
//! Tokens are HMAC-signed JWTs carrying a [`Claims`] payload. Verification is
//! stateless: signature first, then expiry against the injected [`Clock`]
//! with zero leeway. Revocation is layered on top by
//! [`crate::auth::registry::SessionRegistry`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lifedesk_core::clock::Clock;
use lifedesk_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::config::{env_or, ConfigError};

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims embedded in every token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the principal's id, as a string.
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier, so two tokens minted in the same second differ.
    pub jti: String,
}

impl Claims {
    /// Parse `sub` back into a principal id.
    pub fn user_id(&self) -> Result<DbId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Configuration for token signing and lifetimes.
#[derive(Clone)]
pub struct JwtConfig {
    /// Symmetric signing secret.
    pub secret: String,
    /// HMAC algorithm (`HS256`, `HS384`, or `HS512`).
    pub algorithm: Algorithm,
    /// Access token lifetime in minutes (default: 30).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 30;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_expiry_mins", &self.access_token_expiry_mins)
            .field("refresh_token_expiry_days", &self.refresh_token_expiry_days)
            .finish()
    }
}

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ALGORITHM`            | no       | `HS256` |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `30`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if secret.is_empty() {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                reason: "must not be empty".into(),
            });
        }

        let algorithm_name: String = env_or("JWT_ALGORITHM", "HS256".to_string())?;
        let algorithm = parse_hmac_algorithm(&algorithm_name)?;

        Ok(Self {
            secret,
            algorithm,
            access_token_expiry_mins: env_or("JWT_ACCESS_EXPIRY_MINS", DEFAULT_ACCESS_EXPIRY_MINS)?,
            refresh_token_expiry_days: env_or(
                "JWT_REFRESH_EXPIRY_DAYS",
                DEFAULT_REFRESH_EXPIRY_DAYS,
            )?,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }
}

/// Only symmetric algorithms make sense with a shared secret.
pub fn parse_hmac_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: "JWT_ALGORITHM",
        reason: format!("unsupported algorithm '{name}', expected HS256, HS384 or HS512"),
    };
    match Algorithm::from_str(name).map_err(|_| invalid())? {
        alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => Ok(alg),
        _ => Err(invalid()),
    }
}

/// Issues and verifies tokens with one secret, algorithm, and clock.
#[derive(Clone)]
pub struct TokenCodec {
    config: JwtConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(config.algorithm);
        // Expiry is checked against `clock` after the signature passes.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Encode `{sub, type, iat, exp = now + ttl, jti}`.
    pub fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = self.clock.now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            token_type,
            iat: now,
            exp: now + ttl.num_seconds(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.config.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("Token encoding error: {e}")))
    }

    /// Issue an access token with the configured lifetime.
    pub fn issue_access(&self, user_id: DbId) -> Result<String, AuthError> {
        self.issue(&user_id.to_string(), TokenType::Access, self.config.access_ttl())
    }

    /// Issue a refresh token with the configured lifetime.
    pub fn issue_refresh(&self, user_id: DbId) -> Result<String, AuthError> {
        self.issue(&user_id.to_string(), TokenType::Refresh, self.config.refresh_ttl())
    }

    /// Decode and validate a token.
    ///
    /// - [`AuthError::InvalidToken`] on any format or signature failure.
    /// - [`AuthError::ExpiredToken`] when the signature is valid but
    ///   `now >= exp`.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;

        if self.clock.now().timestamp() >= data.claims.exp {
            return Err(AuthError::ExpiredToken);
        }
        Ok(data.claims)
    }

    /// [`Self::verify`], then require a specific token type.
    pub fn verify_typed(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = self.verify(token)?;
        if claims.token_type != expected {
            return Err(AuthError::InvalidTokenType);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use lifedesk_core::clock::ManualClock;

    use super::*;

    /// Helper to build a test config with a known secret.
    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            algorithm: Algorithm::HS256,
            access_token_expiry_mins: 30,
            refresh_token_expiry_days: 7,
        }
    }

    fn codec_with_clock() -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (TokenCodec::new(test_config(), clock.clone()), clock)
    }

    #[test]
    fn issue_and_verify_access_token() {
        let (codec, _clock) = codec_with_clock();
        let token = codec.issue_access(42).expect("token generation should succeed");

        let claims = codec.verify(&token).expect("token validation should succeed");
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn type_claim_is_serialized_as_lowercase_type() {
        let (codec, _clock) = codec_with_clock();
        let token = codec.issue_refresh(7).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(
            jsonwebtoken::decode_header(&token).unwrap().alg,
            Algorithm::HS256
        );

        let claims = codec.verify(&token).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "refresh");
        assert_eq!(json["sub"], "7");
    }

    #[test]
    fn two_tokens_in_the_same_second_differ() {
        let (codec, _clock) = codec_with_clock();
        let a = codec.issue_access(1).unwrap();
        let b = codec.issue_access(1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let (codec, clock) = codec_with_clock();
        let ttl = Duration::minutes(10);
        let token = codec.issue("1", TokenType::Access, ttl).unwrap();

        clock.advance(ttl - Duration::seconds(1));
        assert!(codec.verify(&token).is_ok(), "one second before exp must pass");

        clock.advance(Duration::seconds(1));
        assert_matches!(codec.verify(&token), Err(AuthError::ExpiredToken));

        clock.advance(Duration::days(1));
        assert_matches!(codec.verify(&token), Err(AuthError::ExpiredToken));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let (codec, _clock) = codec_with_clock();
        let refresh = codec.issue_refresh(5).unwrap();

        assert_matches!(
            codec.verify_typed(&refresh, TokenType::Access),
            Err(AuthError::InvalidTokenType)
        );
        assert!(codec.verify_typed(&refresh, TokenType::Refresh).is_ok());
    }

    #[test]
    fn flipping_any_character_invalidates_the_token() {
        let (codec, _clock) = codec_with_clock();
        let token = codec.issue_access(99).unwrap();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert_matches!(
                codec.verify(&tampered),
                Err(AuthError::InvalidToken),
                "tampering at position {i} must be detected"
            );
        }
    }

    #[test]
    fn different_secrets_fail() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());
        let codec_a = TokenCodec::new(test_config(), clock.clone());
        let codec_b = TokenCodec::new(
            JwtConfig {
                secret: "secret-bravo".to_string(),
                ..test_config()
            },
            clock,
        );

        let token = codec_a.issue_access(1).unwrap();
        assert_matches!(codec_b.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn garbage_is_invalid_not_expired() {
        let (codec, _clock) = codec_with_clock();
        assert_matches!(codec.verify(""), Err(AuthError::InvalidToken));
        assert_matches!(codec.verify("not.a.jwt"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn only_hmac_algorithms_are_accepted() {
        assert_eq!(parse_hmac_algorithm("HS512").unwrap(), Algorithm::HS512);
        assert!(parse_hmac_algorithm("RS256").is_err());
        assert!(parse_hmac_algorithm("none").is_err());
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("test-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
