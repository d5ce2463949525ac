//! HTTP-level integration tests for the `/auth` endpoints.
//!
//! Tests cover registration, login, guest accounts, token refresh, logout,
//! and the per-user session cap. Everything runs against in-memory stores.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{access_token, body_json, build_test_app};
use serde_json::json;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_returns_201_without_password_hash() {
    let app = build_test_app();
    let json = app.register("alice@example.com", "alice", "pw123").await;

    assert_eq!(json["email"], "alice@example.com");
    assert_eq!(json["username"], "alice");
    assert_eq!(json["role"], "user");
    assert_eq!(json["is_verified"], false);
    assert_eq!(json["is_guest"], false);
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_returns_409() {
    let app = build_test_app();
    app.register("alice@example.com", "alice", "pw123").await;

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "ALICE@example.com", "username": "alice2", "password": "pw123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "DUPLICATE_EMAIL");
    assert_eq!(json["path"], "/api/v1/auth/register");
}

#[tokio::test]
async fn duplicate_username_returns_409() {
    let app = build_test_app();
    app.register("alice@example.com", "alice", "pw123").await;

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "other@example.com", "username": "alice", "password": "pw123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "DUPLICATE_USERNAME");
}

#[tokio::test]
async fn invalid_registration_returns_400() {
    let app = build_test_app();
    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "not-an-email", "username": "bob", "password": "pw123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_login_me_round_trip() {
    let app = build_test_app();
    let registered = app.register("alice@example.com", "alice", "pw123").await;

    let login = app.login("alice@example.com", "pw123").await;
    assert!(login["refresh_token"].is_string());
    assert_eq!(login["token_type"], "bearer");
    assert_eq!(login["expires_in"], 30 * 60);
    assert_eq!(login["user"]["id"], registered["id"]);

    let response = app
        .get_auth("/api/v1/auth/me", &access_token(&login))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["data"]["id"], registered["id"]);
    assert_eq!(me["data"]["username"], "alice");
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_identical() {
    let app = build_test_app();
    app.register("alice@example.com", "alice", "pw123").await;

    let wrong = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "alice@example.com", "password": "nope" }),
        )
        .await;
    let unknown = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "ghost@example.com", "password": "pw123" }),
        )
        .await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let wrong = body_json(wrong).await;
    let unknown = body_json(unknown).await;
    assert_eq!(wrong["message"], "Invalid email or password");
    assert_eq!(wrong["code"], unknown["code"]);
    assert_eq!(wrong["message"], unknown["message"]);
}

#[tokio::test]
async fn deactivated_user_login_returns_403() {
    let app = build_test_app();
    let alice = app.register("alice@example.com", "alice", "pw123").await;
    let (_admin, admin_token) = app.login_admin().await;

    let response = app
        .post_auth(
            &format!("/api/v1/admin/users/{}/deactivate", alice["id"]),
            &admin_token,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "alice@example.com", "password": "pw123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "ACCOUNT_DEACTIVATED");
}

// ---------------------------------------------------------------------------
// Guests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn guest_gets_access_token_only() {
    let app = build_test_app();
    let response = app.post_json("/api/v1/auth/guest", json!({})).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert!(json.get("refresh_token").is_none());
    assert_eq!(json["user"]["is_guest"], true);
    assert_eq!(json["user"]["is_verified"], true);
    assert_eq!(json["user"]["role"], "guest");
    assert!(json["user"]["username"]
        .as_str()
        .unwrap()
        .starts_with("guest_"));

    let me = app.get_auth("/api/v1/auth/me", &access_token(&json)).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["data"]["id"], json["user"]["id"]);
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_returns_new_access_token_and_does_not_rotate() {
    let app = build_test_app();
    app.register("alice@example.com", "alice", "pw123").await;
    let login = app.login("alice@example.com", "pw123").await;
    let refresh_token = login["refresh_token"].as_str().unwrap();

    for _ in 0..2 {
        let response = app
            .post_json(
                "/api/v1/auth/refresh",
                json!({ "refresh_token": refresh_token }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let token = access_token(&json);
        assert_ne!(token, access_token(&login));

        let me = app.get_auth("/api/v1/auth/me", &token).await;
        assert_eq!(me.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn refresh_with_access_token_is_rejected() {
    let app = build_test_app();
    let token = app.login_new_user("alice@example.com", "alice").await;

    let response = app
        .post_json("/api/v1/auth/refresh", json!({ "refresh_token": token }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Could not validate credentials"
    );
}

#[tokio::test]
async fn expired_refresh_token_is_rejected() {
    let app = build_test_app();
    app.register("alice@example.com", "alice", "pw123").await;
    let login = app.login("alice@example.com", "pw123").await;

    app.clock.advance(Duration::days(7));
    let response = app
        .post_json(
            "/api/v1/auth/refresh",
            json!({ "refresh_token": login["refresh_token"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Logout and sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_invalidates_the_token() {
    let app = build_test_app();
    let token = app.login_new_user("alice@example.com", "alice").await;

    let response = app.post_auth("/api/v1/auth/logout", &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get_auth("/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A second logout with the same token is no longer authenticated.
    let response = app.post_auth("/api/v1/auth/logout", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_all_revokes_every_session() {
    let app = build_test_app();
    app.register("alice@example.com", "alice", "pw123").await;
    let phone = access_token(&app.login("alice@example.com", "pw123").await);
    let laptop = access_token(&app.login("alice@example.com", "pw123").await);

    let response = app.post_auth("/api/v1/auth/logout-all", &phone).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    for token in [&phone, &laptop] {
        let response = app.get_auth("/api/v1/auth/me", token).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn sessions_lists_live_sessions_with_device_info() {
    let app = build_test_app();
    app.register("alice@example.com", "alice", "pw123").await;
    app.login("alice@example.com", "pw123").await;
    let token = access_token(&app.login("alice@example.com", "pw123").await);

    let response = app.get_auth("/api/v1/auth/sessions", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let sessions = json["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["device_info"], "lifedesk-tests/1.0");
    assert!(sessions[0].get("token_hash").is_none());
}

#[tokio::test]
async fn sixth_login_evicts_the_oldest_session() {
    let app = build_test_app();
    app.register("alice@example.com", "alice", "pw123").await;

    let mut tokens = Vec::new();
    for _ in 0..6 {
        tokens.push(access_token(&app.login("alice@example.com", "pw123").await));
        app.clock.advance(Duration::seconds(1));
    }

    let oldest = app.get_auth("/api/v1/auth/me", &tokens[0]).await;
    assert_eq!(oldest.status(), StatusCode::UNAUTHORIZED);
    for token in &tokens[1..] {
        let response = app.get_auth("/api/v1/auth/me", token).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.get_auth("/api/v1/auth/sessions", &tokens[5]).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 5);
}
