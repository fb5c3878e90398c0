//! Creator subscription client.
//!
//! Command-line front end over the platform assembled by
//! `client-bootstrap`. Read commands go through the cached discovery layer;
//! write commands sign with the configured keystore and are sponsored by
//! the relay when `RELAY_URL` is set.
//!
//! # Examples
//!
//! ```bash
//! patreon creators
//! patreon latest --limit 5
//! patreon read 0x5e.. 3 --out ./post-3
//! patreon publish 0x5e.. --title "Sketches" --text "..." --tier 2 --image a.png
//! ```

mod commands;

use anyhow::Result;
use clap::Parser;
use client_bootstrap::{AppConfig, PlatformBuilder, setup_logging};
use commands::Command;

/// Creator subscriptions on Sui
#[derive(Parser)]
#[command(name = "patreon")]
#[command(about = "Browse, unlock and publish creator content", long_about = None)]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let _guard = setup_logging(&config.logging, "patreon")?;

    tracing::info!("Starting patreon client on {}", config.sui.network.as_str());
    let platform = PlatformBuilder::new(config).build().await?;

    cli.command.execute(&platform, cli.json).await
}
