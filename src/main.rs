//! # mapsyncproxy - entry point
//!
//! ## Commands
//!
//! - `serve` runs the HTTP API until SIGINT or SIGTERM
//! - `sync` runs one synchronization and prints its report
//! - `generate` prints the live entries of a map as a manifest
//!
//! Logs go to stderr so that command output on stdout stays machine readable.

use anyhow::{Context, Result};
use clap::Parser;
use mapsync_reconciler::{SourceSelector, SyncRequest};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use mapsyncproxy::{AppConfig, Cli, Commands, build_state};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server = config.server.port(port);
            }
            let state = build_state(&config)?;
            info!("mapsyncproxy {} starting", env!("CARGO_PKG_VERSION"));
            mapsync_web::run_server(&config.server, state)
                .await
                .context("API server failed")?;
            info!("mapsyncproxy stopped");
        }
        Commands::Sync { map, bucket, file } => {
            let state = build_state(&config)?;
            let request = SyncRequest::new(map, SourceSelector::named(bucket, file));
            let report = state
                .reconciler
                .synchronize(&request)
                .await
                .context("Synchronization failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Generate { map } => {
            let state = build_state(&config)?;
            let entries = state
                .reconciler
                .export(&map)
                .await
                .with_context(|| format!("Failed to read map '{map}'"))?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}

/// Initialize tracing subscriber, `RUST_LOG` aware.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
