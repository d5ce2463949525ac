//! Registration, login, guest provisioning, token refresh, and logout.
//!
//! [`Authenticator`] is the only component that mints sessions. It combines
//! the credential store, the [`TokenCodec`], and the [`SessionRegistry`], and
//! also owns the verification primitive the Access Guard runs per request.

use std::sync::{Arc, OnceLock};

use lifedesk_core::clock::Clock;
use lifedesk_core::error::CoreError;
use lifedesk_core::roles::{ROLE_GUEST, ROLE_USER};
use lifedesk_core::types::DbId;
use lifedesk_db::models::user::{NewUser, User, UQ_USERS_EMAIL, UQ_USERS_USERNAME};
use lifedesk_db::{DbError, UserStore};
use rand::Rng;
use validator::Validate;

use crate::auth::error::AuthError;
use crate::auth::jwt::{TokenCodec, TokenType};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::registry::SessionRegistry;

/// Length of the random suffix in synthesized guest usernames.
const GUEST_SUFFIX_LENGTH: usize = 10;

/// Attempts at finding an unused guest username before giving up.
const GUEST_CREATE_ATTEMPTS: usize = 3;

/// Domain used for synthesized guest email addresses.
const GUEST_EMAIL_DOMAIN: &str = "guest.lifedesk.local";

/// Input for [`Authenticator::register`].
#[derive(Debug, Clone, Validate)]
pub struct NewAccount {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 32, message = "must be 3-32 characters"))]
    pub username: String,
    pub password: String,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub display_name: Option<String>,
}

/// Tokens and principal returned by a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Access token and principal for a freshly provisioned guest.
#[derive(Debug)]
pub struct GuestOutcome {
    pub access_token: String,
    pub user: User,
}

/// A newly minted access token.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub user_id: DbId,
}

pub struct Authenticator {
    users: Arc<dyn UserStore>,
    registry: Arc<SessionRegistry>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserStore>,
        registry: Arc<SessionRegistry>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            registry,
            codec,
            clock,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Create a password-backed account with role `user`, unverified.
    pub async fn register(&self, account: NewAccount) -> Result<User, AuthError> {
        let account = NewAccount {
            email: account.email.trim().to_lowercase(),
            username: account.username.trim().to_string(),
            display_name: account
                .display_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            password: account.password,
        };

        account
            .validate()
            .map_err(|e| AuthError::Validation(validation_message(e)))?;
        validate_username_charset(&account.username)?;
        validate_password_strength(&account.password)?;

        if self.users.find_by_email(&account.email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }
        if self.users.find_by_username(&account.username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let input = NewUser {
            username: account.username,
            email: account.email,
            password_hash: Some(hash_password(&account.password)?),
            display_name: account.display_name,
            role: ROLE_USER.to_string(),
            is_verified: false,
            is_guest: false,
        };

        let user = self.users.create(&input).await.map_err(|e| {
            if e.is_unique_violation_of(UQ_USERS_EMAIL) {
                AuthError::DuplicateEmail
            } else if e.is_unique_violation_of(UQ_USERS_USERNAME) {
                AuthError::DuplicateUsername
            } else {
                AuthError::Storage(e)
            }
        })?;

        tracing::info!(user_id = user.id, username = %user.username, "Registered new user");
        Ok(user)
    }

    /// Exchange email + password for an access/refresh token pair.
    ///
    /// Unknown email, wrong password, and passwordless (guest) accounts all
    /// fail with the same [`AuthError::InvalidCredentials`]. The active flag
    /// is only consulted after the password matched.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device_info: Option<String>,
    ) -> Result<LoginOutcome, AuthError> {
        let email = email.trim().to_lowercase();

        let Some(mut user) = self.users.find_by_email(&email).await? else {
            // Burn comparable time so response latency does not reveal
            // whether the email exists.
            let _ = verify_password(password, Some(decoy_hash()));
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, user.usable_password_hash())? {
            tracing::debug!(user_id = user.id, "Login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            tracing::info!(user_id = user.id, "Login refused: account deactivated");
            return Err(AuthError::AccountDeactivated);
        }

        let now = self.clock.now();
        self.users.record_login(user.id, now).await?;
        user.last_login_at = Some(now);
        user.last_seen_at = Some(now);

        let access_token = self.open_session(user.id, device_info).await?;
        let refresh_token = self.codec.issue_refresh(user.id)?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(LoginOutcome {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Provision a passwordless, pre-verified guest and hand back an access
    /// token. Guests get no refresh token.
    pub async fn create_guest(&self, device_info: Option<String>) -> Result<GuestOutcome, AuthError> {
        for attempt in 1..=GUEST_CREATE_ATTEMPTS {
            let username = format!("guest_{}", random_suffix(GUEST_SUFFIX_LENGTH));
            let input = NewUser {
                email: format!("{username}@{GUEST_EMAIL_DOMAIN}"),
                username,
                password_hash: None,
                display_name: Some("Guest".to_string()),
                role: ROLE_GUEST.to_string(),
                is_verified: true,
                is_guest: true,
            };

            match self.users.create(&input).await {
                Ok(user) => {
                    let access_token = self.open_session(user.id, device_info).await?;
                    tracing::info!(user_id = user.id, username = %user.username, "Created guest account");
                    return Ok(GuestOutcome { access_token, user });
                }
                Err(DbError::UniqueViolation { constraint }) => {
                    tracing::warn!(attempt, %constraint, "Guest username collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AuthError::Internal(format!(
            "Could not allocate a unique guest account after {GUEST_CREATE_ATTEMPTS} attempts"
        )))
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The refresh token itself is not rotated and stays usable until it
    /// expires.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        device_info: Option<String>,
    ) -> Result<RefreshOutcome, AuthError> {
        let claims = self.codec.verify_typed(refresh_token, TokenType::Refresh)?;
        let user_id = claims.user_id()?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let access_token = self.open_session(user.id, device_info).await?;
        tracing::debug!(user_id, "Issued access token from refresh token");
        Ok(RefreshOutcome {
            access_token,
            user_id,
        })
    }

    /// Resolve a bearer access token to its principal.
    ///
    /// Checks, in order: signature and expiry, token type, that the principal
    /// exists and is active, and that the session has not been revoked. The
    /// active flag is re-read on every call so deactivation takes effect even
    /// for tokens with live sessions.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.codec.verify_typed(access_token, TokenType::Access)?;
        let user_id = claims.user_id()?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        if !self.registry.is_valid(access_token).await? {
            return Err(AuthError::SessionRevoked);
        }

        Ok(user)
    }

    /// Revoke the session bound to `access_token`.
    pub async fn logout(&self, access_token: &str) -> Result<bool, AuthError> {
        Ok(self.registry.revoke(access_token).await?)
    }

    /// Revoke every session of `user_id`.
    pub async fn logout_all(&self, user_id: DbId) -> Result<u64, AuthError> {
        let revoked = self.registry.revoke_all(user_id).await?;
        tracing::info!(user_id, revoked, "Revoked all sessions");
        Ok(revoked)
    }

    /// Soft-deactivate a principal and revoke its sessions.
    pub async fn deactivate(&self, user_id: DbId) -> Result<bool, AuthError> {
        let changed = self.users.deactivate(user_id).await?;
        let revoked = self.registry.revoke_all(user_id).await?;
        tracing::info!(user_id, changed, revoked, "Deactivated user");
        Ok(changed)
    }

    /// Mark a principal's verification as complete.
    pub async fn mark_verified(&self, user_id: DbId) -> Result<bool, AuthError> {
        Ok(self.users.mark_verified(user_id).await?)
    }

    /// Issue an access token and register its session.
    async fn open_session(
        &self,
        user_id: DbId,
        device_info: Option<String>,
    ) -> Result<String, AuthError> {
        let access_token = self.codec.issue_access(user_id)?;
        self.registry
            .create(
                user_id,
                &access_token,
                self.codec.config().access_ttl(),
                device_info,
            )
            .await?;
        Ok(access_token)
    }
}

fn validation_message(errors: validator::ValidationErrors) -> String {
    match CoreError::from(errors) {
        CoreError::Validation(msg) => msg,
        other => other.to_string(),
    }
}

/// Usernames are ASCII letters, digits, `_`, `.` and `-`. The `guest_`
/// prefix is reserved.
fn validate_username_charset(username: &str) -> Result<(), AuthError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-');
    if !username.chars().all(allowed) {
        return Err(AuthError::Validation(
            "username: may only contain letters, digits, '_', '.' and '-'".into(),
        ));
    }
    if username.starts_with("guest_") {
        return Err(AuthError::Validation(
            "username: the 'guest_' prefix is reserved".into(),
        ));
    }
    Ok(())
}

fn random_suffix(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// A fixed Argon2id hash compared against when the email is unknown.
fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| match hash_password("decoy-password") {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Could not build decoy hash, unknown-email logins will skip verification"
            );
            String::new()
        }
    })
}
