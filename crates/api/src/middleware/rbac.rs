//! Route-level access policies.
//!
//! A [`Policy`] is a list of [`Requirement`]s evaluated against the
//! [`Resolution`] recorded by [`super::auth::resolve_principal`]. It is a
//! tower [`Layer`], attached at route registration time:
//!
//! ```ignore
//! Router::new()
//!     .route("/users/{id}/deactivate", post(admin::deactivate_user))
//!     .route_layer(Policy::authenticated().any_role(&[ROLE_ADMIN]))
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use tower::{Layer, Service};

use super::auth::{rejection_error, Principal, Resolution};
use crate::auth::AuthError;
use crate::error::AppError;

/// A single predicate over the resolved principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    /// `is_verified` must be set.
    Verified,
    /// The principal's role must be one of these.
    AnyRole(&'static [&'static str]),
    /// The principal's role must grant at least one of these permissions.
    AnyPermission(&'static [&'static str]),
}

impl Requirement {
    fn check(&self, principal: &Principal) -> Result<(), AuthError> {
        match self {
            Requirement::Authenticated => Ok(()),
            Requirement::Verified if principal.user.is_verified => Ok(()),
            Requirement::Verified => Err(AuthError::NotVerified),
            Requirement::AnyRole(roles) if roles.iter().any(|r| *r == principal.role()) => Ok(()),
            Requirement::AnyRole(roles) => Err(AuthError::Unauthorized(format!(
                "requires role {}",
                roles.join(" or ")
            ))),
            Requirement::AnyPermission(perms) if perms.iter().any(|p| principal.has_permission(p)) => {
                Ok(())
            }
            Requirement::AnyPermission(perms) => Err(AuthError::Unauthorized(format!(
                "requires permission {}",
                perms.join(" or ")
            ))),
        }
    }
}

/// An ordered set of requirements. Every requirement implies
/// authentication, so anonymous callers are always rejected with 401.
#[derive(Debug, Clone)]
pub struct Policy {
    requirements: Arc<Vec<Requirement>>,
}

impl Policy {
    pub fn authenticated() -> Self {
        Self {
            requirements: Arc::new(vec![Requirement::Authenticated]),
        }
    }

    pub fn verified(self) -> Self {
        self.with(Requirement::Verified)
    }

    pub fn any_role(self, roles: &'static [&'static str]) -> Self {
        self.with(Requirement::AnyRole(roles))
    }

    pub fn any_permission(self, permissions: &'static [&'static str]) -> Self {
        self.with(Requirement::AnyPermission(permissions))
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    fn with(self, requirement: Requirement) -> Self {
        let mut requirements = Vec::clone(&self.requirements);
        requirements.push(requirement);
        Self {
            requirements: Arc::new(requirements),
        }
    }

    /// Evaluate against a request's resolution. A missing resolution means
    /// the resolver middleware was not installed, which is a server error.
    pub fn evaluate(&self, resolution: Option<&Resolution>) -> Result<(), AppError> {
        let principal = match resolution {
            Some(Resolution::Resolved(principal)) => principal,
            Some(Resolution::Anonymous) => return Err(AppError::Unauthenticated),
            Some(Resolution::Rejected(err)) => return Err(rejection_error(err)),
            None => {
                return Err(AppError::InternalError(
                    "Principal resolution middleware is not installed".into(),
                ))
            }
        };

        for requirement in self.requirements.iter() {
            if let Err(err) = requirement.check(principal) {
                tracing::debug!(
                    user_id = principal.user_id(),
                    ?requirement,
                    "Access policy denied request"
                );
                return Err(err.into());
            }
        }
        Ok(())
    }
}

impl<S> Layer<S> for Policy {
    type Service = PolicyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PolicyService {
            inner,
            policy: self.clone(),
        }
    }
}

/// Service produced by [`Policy`]. Short-circuits with the policy's error
/// response before the inner service runs.
#[derive(Debug, Clone)]
pub struct PolicyService<S> {
    inner: S,
    policy: Policy,
}

impl<S> Service<Request> for PolicyService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        if let Err(err) = self.policy.evaluate(request.extensions().get::<Resolution>()) {
            return Box::pin(async move { Ok(err.into_response()) });
        }

        // The clone may not be ready; call the instance that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(request).await })
    }
}
