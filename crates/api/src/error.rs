use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use lifedesk_core::error::CoreError;
use lifedesk_db::DbError;
use serde_json::json;

use crate::auth::AuthError;

/// Message used for every token or session failure on a guarded route.
pub const CREDENTIALS_REJECTED: &str = "Could not validate credentials";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`], [`AuthError`] and [`DbError`] and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses; the request path is filled in afterwards by
/// [`crate::middleware::envelope::error_envelope`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `lifedesk_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An authentication or authorization failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A storage error from `lifedesk_db`.
    #[error(transparent)]
    Database(#[from] DbError),

    /// A guarded route was called without usable credentials.
    #[error("Could not validate credentials")]
    Unauthenticated,

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// Error details attached to a response as an extension so the envelope
/// middleware can rebuild the body with the request path.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Auth(auth) => classify_auth_error(auth),
            AppError::Database(err) => classify_db_error(err),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                CREDENTIALS_REJECTED.to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let mut response = error_response(status, code, &message, None);
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response.extensions_mut().insert(ErrorReport { code, message });
        response
    }
}

/// Render the standard error body.
pub fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    path: Option<&str>,
) -> Response {
    let body = json!({
        "error": true,
        "code": code,
        "message": message,
        "status_code": status.as_u16(),
        "path": path,
    });
    (status, axum::Json(body)).into_response()
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Token failures share one message so a client cannot tell a forged token
/// from an expired or revoked one.
fn classify_auth_error(err: &AuthError) -> (StatusCode, &'static str, String) {
    match err {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            err.to_string(),
        ),
        AuthError::InvalidToken
        | AuthError::ExpiredToken
        | AuthError::InvalidTokenType
        | AuthError::SessionRevoked => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            CREDENTIALS_REJECTED.to_string(),
        ),
        AuthError::AccountDeactivated => {
            (StatusCode::FORBIDDEN, "ACCOUNT_DEACTIVATED", err.to_string())
        }
        AuthError::NotVerified => (StatusCode::FORBIDDEN, "NOT_VERIFIED", err.to_string()),
        AuthError::Unauthorized(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),
        AuthError::DuplicateEmail => (StatusCode::CONFLICT, "DUPLICATE_EMAIL", err.to_string()),
        AuthError::DuplicateUsername => {
            (StatusCode::CONFLICT, "DUPLICATE_USERNAME", err.to_string())
        }
        AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        AuthError::Storage(db) => classify_db_error(db),
        AuthError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal authentication error");
            internal()
        }
    }
}

/// Classify a storage error into an HTTP status, error code, and message.
///
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_db_error(err: &DbError) -> (StatusCode, &'static str, String) {
    match err {
        DbError::UniqueViolation { constraint } if constraint.starts_with("uq_") => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Duplicate value violates unique constraint: {constraint}"),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
