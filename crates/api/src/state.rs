use std::sync::Arc;

use lifedesk_core::clock::Clock;
use lifedesk_db::UserStore;

use crate::auth::{Authenticator, SessionRegistry, TokenCodec};
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). Everything here is
/// constructed once at startup and injected; there is no global state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Principal storage, used directly by the guard and admin handlers.
    pub users: Arc<dyn UserStore>,
    /// Issued-session bookkeeping.
    pub registry: Arc<SessionRegistry>,
    /// Token signing and verification.
    pub codec: Arc<TokenCodec>,
    /// Registration, login, refresh, logout.
    pub authenticator: Arc<Authenticator>,
    /// Time source shared by every component above.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the authentication components together around the given stores.
    pub fn new(
        config: ServerConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn lifedesk_db::SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(config.jwt.clone(), clock.clone()));
        let registry = Arc::new(SessionRegistry::new(
            sessions,
            clock.clone(),
            config.sessions.max_sessions_per_user,
        ));
        let authenticator = Arc::new(Authenticator::new(
            users.clone(),
            registry.clone(),
            codec.clone(),
            clock.clone(),
        ));

        Self {
            config: Arc::new(config),
            users,
            registry,
            codec,
            authenticator,
            clock,
        }
    }
}
