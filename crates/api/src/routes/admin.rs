//! Route definitions for the `/admin` resource.

use axum::routing::post;
use axum::Router;
use lifedesk_core::roles::{permissions, ROLE_ADMIN};

use crate::handlers::admin;
use crate::middleware::rbac::Policy;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// POST /users/{id}/deactivate  -> deactivate_user (role admin)
/// POST /users/{id}/verify      -> verify_user (permission users:manage)
/// ```
pub fn router() -> Router<AppState> {
    let admins_only = Router::new()
        .route("/users/{id}/deactivate", post(admin::deactivate_user))
        .route_layer(Policy::authenticated().any_role(&[ROLE_ADMIN]));

    let user_managers = Router::new()
        .route("/users/{id}/verify", post(admin::verify_user))
        .route_layer(Policy::authenticated().any_permission(&[permissions::USERS_MANAGE]));

    admins_only.merge(user_managers)
}
