//! Bearer-token resolution and principal extractors.
//!
//! [`resolve_principal`] runs once per request and stores a [`Resolution`]
//! in the request extensions. The extractors and [`super::rbac::Policy`]
//! only read that value, so a token is never verified twice per request.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use lifedesk_core::roles;
use lifedesk_core::types::DbId;
use lifedesk_db::models::user::User;

use crate::auth::AuthError;
use crate::error::AppError;
use crate::state::AppState;

/// An authenticated caller together with the token it presented.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub access_token: String,
}

impl Principal {
    pub fn user_id(&self) -> DbId {
        self.user.id
    }

    pub fn role(&self) -> &str {
        &self.user.role
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        roles::has_permission(&self.user.role, permission)
    }
}

/// Outcome of resolving the `Authorization` header.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// No credentials were presented.
    Anonymous,
    Resolved(Arc<Principal>),
    /// Credentials were presented but did not identify an active session,
    /// or the lookup itself failed.
    Rejected(Arc<AuthError>),
}

/// Middleware: resolve the bearer token and record the [`Resolution`].
///
/// Never rejects on its own; the extractors and policies decide what an
/// anonymous or rejected caller may do.
pub async fn resolve_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolution = resolve(&state, request.headers()).await;
    request.extensions_mut().insert(resolution);
    next.run(request).await
}

/// Resolve request headers to a [`Resolution`].
pub async fn resolve(state: &AppState, headers: &HeaderMap) -> Resolution {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Resolution::Anonymous;
    };
    let Some(token) = bearer_token(value) else {
        tracing::debug!("Rejected malformed Authorization header");
        return Resolution::Rejected(Arc::new(AuthError::InvalidToken));
    };

    match state.authenticator.authenticate(token).await {
        Ok(user) => {
            if let Err(e) = state.users.touch_last_seen(user.id, state.clock.now()).await {
                tracing::warn!(user_id = user.id, error = %e, "Failed to update last_seen_at");
            }
            Resolution::Resolved(Arc::new(Principal {
                user,
                access_token: token.to_string(),
            }))
        }
        Err(e) => {
            if e.is_authentication_failure() {
                tracing::debug!(reason = %e, "Rejected bearer token");
            } else {
                tracing::error!(error = %e, "Principal resolution failed");
            }
            Resolution::Rejected(Arc::new(e))
        }
    }
}

/// Extract the token from `Bearer <token>`. The scheme is matched
/// case-insensitively; an empty token is malformed.
fn bearer_token(value: &HeaderValue) -> Option<&str> {
    let (scheme, token) = value.to_str().ok()?.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn resolution(parts: &Parts) -> Result<&Resolution, AppError> {
    parts.extensions.get::<Resolution>().ok_or_else(|| {
        AppError::InternalError("Principal resolution middleware is not installed".into())
    })
}

/// Convert a rejection into the response a guarded route returns.
///
/// Every authentication failure reads as the same 401; anything else
/// (a storage outage) is a 500.
pub(crate) fn rejection_error(err: &AuthError) -> AppError {
    if err.is_authentication_failure() {
        AppError::Unauthenticated
    } else {
        AppError::InternalError(format!("Principal resolution failed: {err}"))
    }
}

/// Require an authenticated principal.
///
/// ```ignore
/// async fn me(AuthUser(principal): AuthUser) -> AppResult<Json<UserResponse>> {
///     Ok(Json(UserResponse::from(&principal.user)))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match resolution(parts)? {
            Resolution::Resolved(principal) => Ok(AuthUser(Principal::clone(principal))),
            Resolution::Anonymous => Err(AppError::Unauthenticated),
            Resolution::Rejected(err) => Err(rejection_error(err)),
        }
    }
}

/// Require an authenticated principal whose verification is complete.
/// Unverified principals get 403.
#[derive(Debug, Clone)]
pub struct VerifiedUser(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for VerifiedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        if !principal.user.is_verified {
            return Err(AuthError::NotVerified.into());
        }
        Ok(VerifiedUser(principal))
    }
}

/// Optional authentication: `None` for anonymous callers and for every
/// credential that fails to authenticate.
///
/// Storage failures still reject with 500 so an outage is not served as
/// anonymous output.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Principal>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match resolution(parts)? {
            Resolution::Resolved(principal) => Ok(MaybeUser(Some(Principal::clone(principal)))),
            Resolution::Anonymous => Ok(MaybeUser(None)),
            Resolution::Rejected(err) if err.is_authentication_failure() => Ok(MaybeUser(None)),
            Resolution::Rejected(err) => Err(rejection_error(err)),
        }
    }
}
