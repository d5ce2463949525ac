//! Handlers for the `/auth` resource.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use lifedesk_db::models::session::SessionResponse;
use lifedesk_db::models::user::UserResponse;
use serde::{Deserialize, Serialize};

use super::device_info;
use crate::auth::authenticator::NewAccount;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response for `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Response for `POST /auth/guest`. Guests get no refresh token.
#[derive(Debug, Serialize)]
pub struct GuestResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Response for `POST /auth/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

const TOKEN_TYPE: &str = "bearer";

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create a password-backed account. Returns the new user with 201 Created.
/// Does not log the user in.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .authenticator
        .register(NewAccount {
            email: input.email,
            username: input.username,
            password: input.password,
            display_name: input.display_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns access and refresh tokens.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let outcome = state
        .authenticator
        .login(&input.email, &input.password, device_info(&headers))
        .await?;

    Ok(Json(LoginResponse {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        token_type: TOKEN_TYPE,
        expires_in: access_expires_in(&state),
        user: UserResponse::from(&outcome.user),
    }))
}

/// POST /api/v1/auth/guest
///
/// Provision a guest account and return an access token for it.
pub async fn create_guest(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<GuestResponse>)> {
    let outcome = state.authenticator.create_guest(device_info(&headers)).await?;

    Ok((
        StatusCode::CREATED,
        Json(GuestResponse {
            access_token: outcome.access_token,
            token_type: TOKEN_TYPE,
            expires_in: access_expires_in(&state),
            user: UserResponse::from(&outcome.user),
        }),
    ))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new access token. The refresh token is
/// not rotated.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let outcome = state
        .authenticator
        .refresh(&input.refresh_token, device_info(&headers))
        .await?;

    Ok(Json(RefreshResponse {
        access_token: outcome.access_token,
        token_type: TOKEN_TYPE,
        expires_in: access_expires_in(&state),
    }))
}

/// POST /api/v1/auth/logout
///
/// Revoke the session of the presented access token. Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<StatusCode> {
    state.authenticator.logout(&principal.access_token).await?;
    tracing::info!(user_id = principal.user_id(), "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
///
/// Revoke every session of the authenticated user. Returns 204 No Content.
pub async fn logout_all(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<StatusCode> {
    state.authenticator.logout_all(principal.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(AuthUser(principal): AuthUser) -> Json<DataResponse<UserResponse>> {
    Json(DataResponse::new(UserResponse::from(&principal.user)))
}

/// GET /api/v1/auth/sessions
///
/// Live sessions of the authenticated user, oldest first.
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<Json<DataResponse<Vec<SessionResponse>>>> {
    let sessions = state.registry.active_for_user(principal.user_id()).await?;
    Ok(Json(DataResponse::new(
        sessions.iter().map(SessionResponse::from).collect(),
    )))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn access_expires_in(state: &AppState) -> i64 {
    state.codec.config().access_ttl().num_seconds()
}
