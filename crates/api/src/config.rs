use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Configuration failures. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Read `key` from the environment, falling back to `default` when unset.
///
/// A value that is set but does not parse is an error rather than a silent
/// fallback.
pub fn env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Session registry limits.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum concurrently active sessions per user (default: `5`).
    pub max_sessions_per_user: usize,
    /// Interval of the expired-session cleanup job (default: `3600`).
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_user: 5,
            cleanup_interval_secs: 3600,
        }
    }
}

impl SessionConfig {
    /// | Env Var                          | Default |
    /// |----------------------------------|---------|
    /// | `SESSION_MAX_PER_USER`           | `5`     |
    /// | `SESSION_CLEANUP_INTERVAL_SECS`  | `3600`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_sessions_per_user = env_or("SESSION_MAX_PER_USER", defaults.max_sessions_per_user)?;
        if max_sessions_per_user == 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_MAX_PER_USER",
                reason: "must be at least 1".into(),
            });
        }
        let cleanup_interval_secs =
            env_or("SESSION_CLEANUP_INTERVAL_SECS", defaults.cleanup_interval_secs)?;
        if cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_CLEANUP_INTERVAL_SECS",
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self {
            max_sessions_per_user,
            cleanup_interval_secs,
        })
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have sensible defaults suitable for
/// local development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Token signing and lifetimes.
    pub jwt: JwtConfig,
    /// Session limits and cleanup cadence.
    pub sessions: SessionConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    ///
    /// See [`JwtConfig::from_env`] and [`SessionConfig::from_env`] for the rest.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port: env_or("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30)?,
            jwt: JwtConfig::from_env()?,
            sessions: SessionConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    // Each test uses its own variable name so parallel tests do not race.

    #[test]
    fn env_or_falls_back_when_unset() {
        assert_eq!(env_or("LIFEDESK_TEST_UNSET_KEY", 42u16).unwrap(), 42);
    }

    #[test]
    fn env_or_parses_set_values() {
        std::env::set_var("LIFEDESK_TEST_PARSED_KEY", " 8080 ");
        assert_eq!(env_or("LIFEDESK_TEST_PARSED_KEY", 3000u16).unwrap(), 8080);
    }

    #[test]
    fn env_or_rejects_garbage_instead_of_defaulting() {
        std::env::set_var("LIFEDESK_TEST_GARBAGE_KEY", "lots");
        assert_matches!(
            env_or("LIFEDESK_TEST_GARBAGE_KEY", 5usize),
            Err(ConfigError::Invalid { key: "LIFEDESK_TEST_GARBAGE_KEY", .. })
        );
    }

    #[test]
    fn zero_cleanup_interval_is_rejected() {
        // The only test that sets the session variables.
        std::env::set_var("SESSION_CLEANUP_INTERVAL_SECS", "0");
        let result = SessionConfig::from_env();
        std::env::remove_var("SESSION_CLEANUP_INTERVAL_SECS");
        assert_matches!(
            result,
            Err(ConfigError::Invalid { key: "SESSION_CLEANUP_INTERVAL_SECS", .. })
        );
    }

    #[test]
    fn session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_sessions_per_user, 5);
        assert_eq!(config.cleanup_interval_secs, 3600);
    }
}
