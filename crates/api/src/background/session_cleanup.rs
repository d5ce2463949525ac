//! Periodic purge of stale sessions.
//!
//! Deletes inactive and expired rows from the session store so revoked and
//! expired sessions do not accumulate. Runs on a fixed interval using
//! `tokio::time::interval`; the first pass runs immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auth::SessionRegistry;

/// Run the session cleanup loop until `cancel` is triggered.
pub async fn run(registry: Arc<SessionRegistry>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Session cleanup job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match registry.purge_expired().await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Session cleanup: purged stale sessions");
                    }
                    Ok(_) => tracing::debug!("Session cleanup: nothing to purge"),
                    Err(e) => {
                        tracing::error!(error = %e, "Session cleanup: purge failed");
                    }
                }
            }
        }
    }
}
