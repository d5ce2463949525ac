//! Handlers for the `/admin` resource (user lifecycle).
//!
//! Access is enforced by the [`Policy`](crate::middleware::rbac::Policy)
//! layers in [`crate::routes::admin`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use lifedesk_core::error::CoreError;
use lifedesk_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// POST /api/v1/admin/users/{id}/deactivate
///
/// Soft-deactivate a user and revoke all of their sessions. Returns 204.
pub async fn deactivate_user(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if admin.user_id() == id {
        return Err(AppError::BadRequest(
            "Administrators cannot deactivate their own account".into(),
        ));
    }
    ensure_user_exists(&state, id).await?;

    state.authenticator.deactivate(id).await?;
    tracing::info!(admin_id = admin.user_id(), user_id = id, "Admin deactivated user");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/users/{id}/verify
///
/// Mark a user's verification as complete. Idempotent. Returns 204.
pub async fn verify_user(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    ensure_user_exists(&state, id).await?;

    if state.authenticator.mark_verified(id).await? {
        tracing::info!(admin_id = admin.user_id(), user_id = id, "Admin verified user");
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_user_exists(state: &AppState, id: DbId) -> AppResult<()> {
    state
        .users
        .find_by_id(id)
        .await?
        .map(|_| ())
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))
}
