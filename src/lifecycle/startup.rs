//! Startup orchestration.
//!
//! # Responsibilities
//! - Create the connection tracker and start the store connection
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - The store connection is spawned, not awaited; the listener comes up
//!   whether it is pending, failed, or never configured
//! - Bind errors are the only startup failure

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::GatewayConfig;
use crate::http::GatewayServer;
use crate::lifecycle::Shutdown;
use crate::store::{ConnectionTracker, StoreDriver};

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to a gateway serving in the background.
pub struct RunningGateway {
    /// Address the listener is bound to.
    pub local_addr: SocketAddr,
    /// Tracker shared with the request gate.
    pub tracker: ConnectionTracker,
    /// Server task; resolves after graceful shutdown.
    pub server: JoinHandle<std::io::Result<()>>,
}

/// Start the gateway with `driver` as the store driver.
pub async fn start(
    config: GatewayConfig,
    driver: Arc<dyn StoreDriver>,
    shutdown: &Shutdown,
) -> Result<RunningGateway, StartupError> {
    let tracker = ConnectionTracker::new(driver);

    // Fire and forget; the outcome lands in the tracker's state
    tracker.initiate_connection(config.store.connection_target.clone());

    let address = config.listener.bind_address.clone();
    let bind_error = |source| StartupError::Bind {
        address: address.clone(),
        source,
    };
    let listener = TcpListener::bind(&address).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    tracing::info!(address = %local_addr, "Listening for connections");
    tracing::info!("Health check: http://{}{}", local_addr, config.health.path);

    let server = GatewayServer::new(config, tracker.clone());
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()));

    Ok(RunningGateway {
        local_addr,
        tracker,
        server,
    })
}
