use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lifedesk_api::background::session_cleanup;
use lifedesk_api::config::{ConfigError, ServerConfig};
use lifedesk_api::router::build_app_router;
use lifedesk_api::state::AppState;
use lifedesk_core::clock::{Clock, SystemClock};
use lifedesk_db::repositories::{SessionRepo, UserRepo};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lifedesk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

/// Startup failures that abort the process.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid HOST address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

async fn run() -> Result<(), StartupError> {
    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        max_sessions_per_user = config.sessions.max_sessions_per_user,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

    let pool = lifedesk_db::create_pool(&database_url).await?;
    tracing::info!("Database connection pool created");

    lifedesk_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    lifedesk_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- App state ---
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(
        config.clone(),
        Arc::new(UserRepo::new(pool.clone())),
        Arc::new(SessionRepo::new(pool.clone())),
        clock,
    );

    // --- Session cleanup ---
    let cleanup_cancel = CancellationToken::new();
    let cleanup_handle = tokio::spawn(session_cleanup::run(
        Arc::clone(&state.registry),
        Duration::from_secs(config.sessions.cleanup_interval_secs),
        cleanup_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state, &config)?;

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cleanup_cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, cleanup_handle).await.is_err() {
        tracing::warn!("Session cleanup job did not stop in time");
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
