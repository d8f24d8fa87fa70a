//! # custody-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the evidence custody stack.
//! Configuration comes from the environment; see [`AppConfig::from_env`].

use custody_api::state::{AppConfig, AppState, LogFormat};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    // Initialize structured tracing before reporting any config error.
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );

    let config = config.map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");

    let metrics = PrometheusBuilder::new().install_recorder().map_err(|e| {
        tracing::error!("Failed to install metrics recorder: {e}");
        e
    })?;

    let port = config.port;
    let state = AppState::from_config(config)
        .map_err(|e| {
            tracing::error!("Startup failed: {e}");
            e
        })?
        .with_metrics(metrics);

    let app = custody_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Custody API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
