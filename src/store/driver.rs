//! Store driver contract.
//!
//! A driver owns the actual session with the backing store. The tracker only
//! needs three things from it: an async connect, a stream of lifecycle
//! events, and a synchronous readiness flag.

use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::broadcast;

/// Lifecycle notifications published by a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// The session failed. Usually followed by `Disconnected`.
    Error(String),
    /// The session was lost.
    Disconnected,
    /// A lost session was re-established by the driver.
    Reconnected,
}

impl DriverEvent {
    /// Label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DriverEvent::Error(_) => "error",
            DriverEvent::Disconnected => "disconnected",
            DriverEvent::Reconnected => "reconnected",
        }
    }
}

/// Details of an established session, safe to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Seed hosts of the session, comma separated, without credentials.
    pub hosts: String,
}

/// Errors raised while establishing a session.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The connection target could not be parsed or resolved.
    #[error("invalid connection target: {0}")]
    InvalidTarget(String),

    /// No server answered within the connect timeout.
    #[error("store at {hosts} unreachable after {after:?}: {reason}")]
    Unreachable {
        hosts: String,
        after: Duration,
        reason: String,
    },

    /// A server answered but refused the session (handshake or authentication).
    #[error("store at {hosts} refused the session: {reason}")]
    Rejected { hosts: String, reason: String },
}

/// Capacity of the lifecycle event channel drivers should allocate.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Interface a store driver fulfills for the connection tracker.
pub trait StoreDriver: Send + Sync + 'static {
    /// Establish a session with the store at `target`.
    fn connect<'a>(&'a self, target: &'a str) -> BoxFuture<'a, Result<SessionInfo, DriverError>>;

    /// Subscribe to lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<DriverEvent>;

    /// Live readiness of the underlying session. Must not perform I/O.
    fn is_ready(&self) -> bool;
}
