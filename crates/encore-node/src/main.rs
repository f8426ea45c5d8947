//! Encore settlement daemon — entry point.
//!
//! Builds an [`EncoreNode`] (rail registry, verification engine, settlement
//! ledger, distribution allocator, reconciliation sweeper) and drives the
//! sweeper until shutdown. Deployment-specific processor and chain clients
//! are registered by the embedding service; out of the box the daemon serves
//! the internal credit rail.

// Public APIs for node internals — used by tests and embedding services.
#![allow(dead_code)]

mod config;
mod node;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::EncoreConfig;
use node::EncoreNode;

/// Encore settlement daemon
#[derive(Parser, Debug)]
#[command(name = "encore-node", version, about = "Encore settlement daemon")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "encore.toml")]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.init {
        std::fs::write(&args.config, EncoreConfig::default_toml()?)?;
        println!("wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let config = if args.config.exists() {
        EncoreConfig::load(&args.config)?
    } else {
        EncoreConfig::default()
    };

    let level = args.log_level.unwrap_or_else(|| config.logging.level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(config = %args.config.display(), "starting encore-node");

    let node = EncoreNode::new(&config, Vec::new());

    tokio::select! {
        _ = node.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!(inflight = node.inflight_count(), "shutdown requested");
        }
    }

    Ok(())
}
