//! Hooklog Web Server - signed webhook receiver.
//!
//! This binary:
//! - Accepts webhook callbacks on a single path (`POST` submit, `HEAD` probe)
//! - Verifies legacy or structured HMAC-SHA256 signatures
//! - Logs each accepted payload as a readable record to console and file
//!
//! Configuration comes from environment variables, see [`hooklog::Config`].

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;

use hooklog::logging::init_logging;
use hooklog::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first: it decides where logs go
    let config = Config::from_env();

    init_logging(&config)?;

    info!("web_server_starting");
    info!(
        port = config.port,
        webhook_path = %config.webhook_path,
        signature_verification = config.verification_enabled(),
        include_self_messages = config.include_self_messages,
        log_file = ?config.log_file,
        body_limit_bytes = config.body_limit_bytes,
        "config_loaded"
    );

    if !config.verification_enabled() {
        tracing::warn!("webhook_secret_not_configured_open_mode");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // Build the router
    let app = router(AppState::new(config));

    // Bind to address
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
