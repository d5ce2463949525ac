//! Request-level authentication and authorization.
//!
//! - [`auth::resolve_principal`] -- resolves the bearer token on every request.
//! - [`auth::AuthUser`], [`auth::VerifiedUser`], [`auth::MaybeUser`] -- extractors
//!   over the resolved principal.
//! - [`rbac::Policy`] -- route-level role/permission requirements.
//! - [`envelope::error_envelope`] -- uniform error bodies carrying the request path.

pub mod auth;
pub mod envelope;
pub mod rbac;
