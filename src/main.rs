//! Store-aware HTTP gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                  GATEWAY                      │
//!   Client Request      │  ┌─────────┐   ┌────────────┐   ┌─────────┐  │
//!   ────────────────────┼─▶│  http   │──▶│ store gate │──▶│  proxy  │──┼──▶ Upstream
//!                       │  │ server  │   │ (per group)│   │         │  │    App Server
//!                       │  └────┬────┘   └─────┬──────┘   └─────────┘  │
//!                       │       │ health       │ is_usable()            │
//!                       │       ▼              ▼                        │
//!                       │  ┌───────────────────────────┐                │
//!                       │  │    connection tracker     │◀── events ─────┼─── Store
//!                       │  │  (atomic state + driver)  │                │    Driver
//!                       │  └───────────────────────────┘                │
//!                       └──────────────────────────────────────────────┘
//! ```
//!
//! The store connection starts in the background; the listener comes up
//! regardless of its outcome.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use store_gateway::config::load_config;
use store_gateway::lifecycle::{self, signals::shutdown_signal, Shutdown};
use store_gateway::observability::{logging, metrics};
use store_gateway::store::MongoStoreDriver;

#[derive(Parser)]
#[command(name = "store-gateway")]
#[command(about = "HTTP gateway that fails fast while its backing store is unavailable", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal in production
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("store-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = ?config.environment,
        routes = config.routes.len(),
        store_configured = config.store.connection_target.is_some(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let driver = Arc::new(MongoStoreDriver::new(config.store.clone(), shutdown.clone()));

    let gateway = lifecycle::start(config, driver, &shutdown).await?;

    shutdown_signal().await;
    shutdown.trigger();

    gateway.server.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
