//! Relay service entry point.
//!
//! Receives landmark frames over WebSocket and forwards them to the outlet.

use anyhow::Result;
use decoder::Decoder;
use metrics_exporter_prometheus::PrometheusBuilder;
use relay::{build_outlet, serve, AppState, Dispatcher, RelayConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout belongs to the stdout outlet.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RelayConfig::from_env()?;

    info!("Starting relay ({})", config.variant);
    info!("Configuration:");
    info!("  LISTEN: {}", config.listen_addr());
    info!("  CONVENTION: {:?}", config.convention);
    info!("  OUTLET: {}", config.outlet);

    if let Some(metrics_port) = config.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], metrics_port))
            .install()?;
        info!("Prometheus metrics server started on port {}", metrics_port);
    }

    let outlet = build_outlet(&config.outlet).await?;
    let dispatcher = Dispatcher::new(Decoder::new(config.convention.clone()), outlet);
    let state = Arc::new(AppState::new(config.variant, dispatcher));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr).await?;
    info!("Relay listening on ws://{}", addr);

    serve(listener, state, shutdown_signal()).await?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
    }
}
