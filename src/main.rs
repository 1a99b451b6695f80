//! Sprint Export - presentation export server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sprint_export::{api::create_router, spawn_cleanup_task, AppState, Config};

/// Main entry point for the export server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the artifact cache, renderers and orchestrator
/// 4. Start background TTL cleanup task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM, then dispose the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sprint_export=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sprint Export Server");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        cache_max_size = config.cache_max_size,
        cache_max_entries = config.cache_max_entries,
        cache_ttl_ms = config.cache_ttl_ms,
        cleanup_interval_ms = config.cache_cleanup_interval_ms,
        asset_fetch_timeout_ms = config.asset_fetch_timeout_ms,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config);
    let cache = state.cache().clone();
    info!(formats = ?state.orchestrator.registry().formats(), "Renderers registered");

    let cleanup_handle = spawn_cleanup_task(cache.clone(), config.cache_cleanup_interval_ms);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cleanup_handle.abort();
    // Cancellation error expected; awaiting releases the task's cache handle
    let _ = cleanup_handle.await;
    warn!("Cleanup task aborted");

    // The router and its state are gone once serve returns
    match Arc::try_unwrap(cache) {
        Ok(cache) => cache.into_inner().dispose(),
        Err(_) => warn!("Artifact cache still referenced, skipping dispose"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// A handler that fails to install is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
