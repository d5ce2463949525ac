pub mod admin;
pub mod auth;
pub mod profile;

use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;

/// Longest `device_info` recorded for a session.
const MAX_DEVICE_INFO_LENGTH: usize = 255;

/// Session device description, taken from the `User-Agent` header.
pub(crate) fn device_info(headers: &HeaderMap) -> Option<String> {
    let agent = headers.get(USER_AGENT)?.to_str().ok()?.trim();
    if agent.is_empty() {
        return None;
    }
    Some(agent.chars().take(MAX_DEVICE_INFO_LENGTH).collect())
}
