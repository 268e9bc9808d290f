//! # Sentinel Grid Relay Server
//!
//! Binary entry point for the relay service.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentinel_relay::{AppState, Config, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = sentinel_relay::VERSION,
        "Starting Sentinel Grid relay"
    );

    let state = AppState::with_capacity(config.stream_capacity);
    let app = build_router(state, &config.cors_origins);

    let addr = config.server_addr;
    tracing::info!(
        %addr,
        any_origin = config.allows_any_origin(),
        stream_capacity = config.stream_capacity,
        "Starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Live telemetry stream at http://{}/api/telemetry/stream", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
