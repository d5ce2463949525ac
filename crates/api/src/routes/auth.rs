//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::middleware::rbac::Policy;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register    -> register
/// POST /login       -> login
/// POST /guest       -> create_guest
/// POST /refresh     -> refresh
/// POST /logout      -> logout (authenticated)
/// POST /logout-all  -> logout_all (authenticated)
/// GET  /me          -> me (authenticated)
/// GET  /sessions    -> list_sessions (authenticated)
/// ```
pub fn router() -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/guest", post(auth::create_guest))
        .route("/refresh", post(auth::refresh));

    let authenticated = Router::new()
        .route("/logout", post(auth::logout))
        .route("/logout-all", post(auth::logout_all))
        .route("/me", get(auth::me))
        .route("/sessions", get(auth::list_sessions))
        .route_layer(Policy::authenticated());

    public.merge(authenticated)
}
