//! Handlers for the `/profile` resource.

use axum::Json;
use lifedesk_core::types::DbId;
use serde::Serialize;

use crate::middleware::auth::{MaybeUser, VerifiedUser};
use crate::response::DataResponse;

#[derive(Debug, Serialize)]
pub struct Greeting {
    pub message: String,
    pub authenticated: bool,
    pub user_id: Option<DbId>,
}

/// GET /api/v1/profile/greeting
///
/// Personalized for authenticated callers, generic for everyone else
/// (including callers whose token failed to authenticate).
pub async fn greeting(MaybeUser(principal): MaybeUser) -> Json<DataResponse<Greeting>> {
    let greeting = match principal {
        Some(principal) => {
            let user = &principal.user;
            let name = user.display_name.as_deref().unwrap_or(&user.username);
            Greeting {
                message: format!("Hello, {name}!"),
                authenticated: true,
                user_id: Some(user.id),
            }
        }
        None => Greeting {
            message: "Hello, stranger!".to_string(),
            authenticated: false,
            user_id: None,
        },
    };
    Json(DataResponse::new(greeting))
}

#[derive(Debug, Serialize)]
pub struct VerifiedStatus {
    pub user_id: DbId,
    pub username: String,
    pub is_verified: bool,
}

/// GET /api/v1/profile/verified
///
/// Only reachable by principals whose verification is complete.
pub async fn verified(VerifiedUser(principal): VerifiedUser) -> Json<DataResponse<VerifiedStatus>> {
    Json(DataResponse::new(VerifiedStatus {
        user_id: principal.user.id,
        username: principal.user.username,
        is_verified: true,
    }))
}
