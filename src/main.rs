//! Arbitrage watcher entry point
//!
//! Loads configuration, wires the enabled venue adapters into the
//! watcher, and runs until interrupted. Shutdown propagates through a
//! broadcast channel to the tick loop and any stream readers.

use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use ringgit_arb::adapters::hata::HataAdapter;
use ringgit_arb::adapters::luno::LunoAdapter;
use ringgit_arb::adapters::traits::ExchangeAdapter;
use ringgit_arb::adapters::types::Venue;
use ringgit_arb::config;
use ringgit_arb::core::alerter::Alerter;
use ringgit_arb::core::watcher::Watcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Guards keep the non-blocking file writers alive for the process
    let _log_guards = config::init_logging();

    info!("Loading configuration from config.json");
    let config = match config::load_config(Path::new("config.json")) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!(error = %e, "Configuration failed");
            std::process::exit(1);
        }
    };
    info!(
        pairs = ?config.enabled_pairs(),
        mode = ?config.watcher.mode,
        interval_s = config.watcher.interval_secs,
        "Configuration loaded"
    );

    let mut exchanges: Vec<Arc<dyn ExchangeAdapter>> = Vec::new();
    for venue in [Venue::Luno, Venue::Hata] {
        if !config.exchange(venue).map(|e| e.enabled).unwrap_or(false) {
            continue;
        }
        let adapter: Arc<dyn ExchangeAdapter> = match venue {
            Venue::Luno => Arc::new(LunoAdapter::new(Arc::clone(&config))?),
            Venue::Hata => Arc::new(HataAdapter::new(Arc::clone(&config))?),
        };
        info!(exchange = %venue, "Adapter initialized");
        exchanges.push(adapter);
    }

    let alerter = Alerter::new(config.discord.webhook_url.clone());
    let watcher = Watcher::new(Arc::clone(&config), exchanges, alerter);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let watcher_shutdown = shutdown_tx.clone();
    let watcher_handle = tokio::spawn(async move {
        watcher.run(&watcher_shutdown).await;
    });

    signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");
    let _ = shutdown_tx.send(());
    let _ = watcher_handle.await;
    info!("Clean exit");

    Ok(())
}
