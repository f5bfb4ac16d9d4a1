//! Railbook HTTP server.

use railbook_server::{AppState, Config, bootstrap, build_router, metrics};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        address = %config.bind_address(),
        max_passengers = config.booking.max_passengers_per_booking,
        snapshot = ?config.storage.snapshot_path,
        "Starting Railbook server"
    );

    let metrics_handle = if config.server.metrics_enabled {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let (system, origin) = bootstrap::build_system(&config)?;
    let system = Arc::new(system);
    bootstrap::publish_seat_gauges(&system);
    info!(origin = ?origin, "Reservation state ready");

    let app = build_router(
        AppState::new(Arc::clone(&system), metrics_handle),
        &config.server.cors_allowed_origins,
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    let (draining_tx, draining_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = draining_tx.send(());
    });
    let mut server = std::pin::pin!(server.into_future());

    tokio::select! {
        result = &mut server => result?,
        Ok(()) = draining_rx => {
            let grace = Duration::from_secs(config.server.shutdown_timeout);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(
                    timeout_secs = grace.as_secs(),
                    "Connections still open after shutdown timeout; stopping anyway"
                ),
            }
        }
    }

    match bootstrap::persist(&system, &config) {
        Ok(true) => info!("Snapshot saved"),
        Ok(false) => {}
        Err(e) => error!(error = %e, "Failed to save snapshot"),
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
