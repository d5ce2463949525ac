//! Route definitions for the `/profile` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::profile;
use crate::state::AppState;

/// Routes mounted at `/profile`.
///
/// ```text
/// GET /greeting  -> greeting (optional auth)
/// GET /verified  -> verified (verified principals only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/greeting", get(profile::greeting))
        .route("/verified", get(profile::verified))
}
