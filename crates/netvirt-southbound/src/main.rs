//! southboundd - OVSDB southbound reconciliation daemon
//!
//! Entry point for the southboundd daemon. Without an OVSDB connection
//! it runs against the in-memory collaborators and waits for Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use netvirt_southbound::config::DEFAULT_CONFIG_PATH;
use netvirt_southbound::logging::init_logging;
use netvirt_southbound::memory::{InMemoryInventory, LoggingL3Adapter, LoggingProvider, StaticProviderManager};
use netvirt_southbound::{
    Collaborators, DispatcherConfig, EventDispatcher, Orch, SouthboundConfig, SouthboundHandler,
};

/// OVSDB southbound reconciliation daemon
#[derive(Parser, Debug)]
#[command(name = "southboundd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the file
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = SouthboundConfig::load_optional(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let config_found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json = true;
    }

    init_logging(&config.logging.level, config.logging.json);

    info!("--- Starting southboundd ---");
    if !config_found {
        warn!(path = %args.config.display(), "Config file not found, using defaults");
    }
    info!(
        heartbeat_interval_ms = config.daemon.heartbeat_interval_ms,
        batch_size = config.daemon.batch_size,
        queue_capacity = config.daemon.queue_capacity,
        "Configuration loaded"
    );

    let inventory = Arc::new(InMemoryInventory::new());
    let provider = Arc::new(LoggingProvider::new("logging", true));
    let collaborators = Collaborators {
        topology: inventory.clone(),
        tenants: inventory.clone(),
        bridges: inventory.clone(),
        configuration: inventory,
        providers: Arc::new(StaticProviderManager::new(provider)),
        l3: Arc::new(LoggingL3Adapter),
    };

    let handler = SouthboundHandler::new(collaborators, config.queue_config());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (dispatcher, _sink) =
        EventDispatcher::new(DispatcherConfig::from(&config), handler, shutdown_rx);
    let event_loop = tokio::spawn(dispatcher.run());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Received Ctrl-C, shutting down");
    shutdown_tx
        .send(true)
        .context("event loop exited before shutdown")?;

    let handler = event_loop.await.context("event loop task failed")?;
    for line in handler.dump_pending_tasks() {
        info!("{}", line);
    }

    info!("southboundd stopped");
    Ok(())
}
