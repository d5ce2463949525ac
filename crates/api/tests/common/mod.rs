#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use tower::ServiceExt;

use lifedesk_api::auth::jwt::JwtConfig;
use lifedesk_api::auth::password::hash_password;
use lifedesk_api::config::{ServerConfig, SessionConfig};
use lifedesk_api::router::build_app_router;
use lifedesk_api::state::AppState;
use lifedesk_core::clock::ManualClock;
use lifedesk_core::roles::ROLE_ADMIN;
use lifedesk_db::memory::{MemorySessionStore, MemoryUserStore};
use lifedesk_db::models::user::{NewUser, User};
use lifedesk_db::UserStore;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Build a test `ServerConfig` with safe defaults: 30-minute access tokens,
/// 7-day refresh tokens, at most 5 sessions per user.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            algorithm: Algorithm::HS256,
            access_token_expiry_mins: 30,
            refresh_token_expiry_days: 7,
        },
        sessions: SessionConfig::default(),
    }
}

/// The full router over in-memory stores, plus handles for poking at them.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: Arc<MemoryUserStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub clock: Arc<ManualClock>,
}

/// Build the full application router with all middleware layers over
/// in-memory stores and a manual clock.
///
/// Uses [`build_app_router`] so integration tests exercise the same
/// middleware stack that production uses.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let clock = Arc::new(ManualClock::starting_now());
    let users = Arc::new(MemoryUserStore::new(clock.clone()));
    let sessions = Arc::new(MemorySessionStore::new());

    let state = AppState::new(config.clone(), users.clone(), sessions.clone(), clock.clone());
    let router = build_app_router(state.clone(), &config).expect("test config is valid");

    TestApp {
        router,
        state,
        users,
        sessions,
        clock,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(
            Request::get(uri)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(CONTENT_TYPE, "application/json")
                .header(USER_AGENT, "lifedesk-tests/1.0")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_auth(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Register `email`/`username` with `password` through the API.
    pub async fn register(&self, email: &str, username: &str, password: &str) -> serde_json::Value {
        let response = self
            .post_json(
                "/api/v1/auth/register",
                serde_json::json!({ "email": email, "username": username, "password": password }),
            )
            .await;
        assert_eq!(response.status(), 201, "registration should succeed");
        body_json(response).await
    }

    /// Log in through the API and return the response body.
    pub async fn login(&self, email: &str, password: &str) -> serde_json::Value {
        let response = self
            .post_json(
                "/api/v1/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), 200, "login should succeed");
        body_json(response).await
    }

    /// Register and log in, returning the access token.
    pub async fn login_new_user(&self, email: &str, username: &str) -> String {
        self.register(email, username, "pw123").await;
        access_token(&self.login(email, "pw123").await)
    }

    /// Insert an admin directly into the store and log in as them.
    pub async fn login_admin(&self) -> (User, String) {
        let admin = self
            .users
            .create(&NewUser {
                username: "root".into(),
                email: "root@example.com".into(),
                password_hash: Some(hash_password("admin-pw").unwrap()),
                display_name: None,
                role: ROLE_ADMIN.into(),
                is_verified: true,
                is_guest: false,
            })
            .await
            .unwrap();
        let token = access_token(&self.login("root@example.com", "admin-pw").await);
        (admin, token)
    }
}

pub fn access_token(json: &serde_json::Value) -> String {
    json["access_token"]
        .as_str()
        .expect("response must contain access_token")
        .to_string()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
