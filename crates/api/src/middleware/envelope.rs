//! Uniform error bodies.
//!
//! Rewrites every 4xx/5xx response into
//! `{ "error": true, "code", "message", "status_code", "path" }`. Responses
//! produced by [`AppError`](crate::error::AppError) carry an
//! [`ErrorReport`] and keep their code and message. Other client errors
//! (axum extractor rejections, unmatched routes) are wrapped using their
//! status and plain-text body; other server errors get a generic message.

use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::{error_response, ErrorReport};

/// Upper bound on a non-JSON error body folded into the message.
const MAX_PASSTHROUGH_BODY: usize = 16 * 1024;

pub async fn error_envelope(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let (code, message) = match parts.extensions.remove::<ErrorReport>() {
        Some(report) => (report.code.to_string(), report.message),
        None if status.is_server_error() => (
            status_code_name(status),
            "An internal error occurred".to_string(),
        ),
        None => {
            let bytes = axum::body::to_bytes(body, MAX_PASSTHROUGH_BODY)
                .await
                .unwrap_or_default();
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            let message = if text.is_empty() {
                status.canonical_reason().unwrap_or("Error").to_string()
            } else {
                text
            };
            (status_code_name(status), message)
        }
    };

    let rebuilt = error_response(status, &code, &message, Some(&path));
    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, rebuilt.into_body())
}

/// `404 Not Found` -> `NOT_FOUND`.
fn status_code_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("ERROR")
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
}
