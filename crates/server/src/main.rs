//! `relay` binary.
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use relay_server::{RelayConfig, build_state, router};

fn setup_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    dotenvy::dotenv().ok();
    setup_logging();

    let config = RelayConfig::from_env()?;
    let state = build_state(&config).await?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, network = %config.sui.network.as_str(), "Relay listening");

    axum::serve(listener, router(Arc::new(state)))
        .await
        .context("Relay server stopped")
}
