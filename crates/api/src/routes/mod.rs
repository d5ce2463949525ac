pub mod admin;
pub mod auth;
pub mod health;
pub mod profile;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                        register (public)
/// /auth/login                           login (public)
/// /auth/guest                           create guest (public)
/// /auth/refresh                         refresh (public)
/// /auth/logout                          logout (authenticated)
/// /auth/logout-all                      logout everywhere (authenticated)
/// /auth/me                              current user (authenticated)
/// /auth/sessions                        live sessions (authenticated)
///
/// /profile/greeting                     greeting (optional auth)
/// /profile/verified                     verified-only (verified)
///
/// /admin/users/{id}/deactivate          deactivate (role admin)
/// /admin/users/{id}/verify              mark verified (permission users:manage)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/profile", profile::router())
        .nest("/admin", admin::router())
}
