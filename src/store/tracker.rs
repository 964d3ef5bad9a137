//! Connection state tracker.
//!
//! # Responsibilities
//! - Start the store connection in the background at process start
//! - Follow driver lifecycle events and keep [`ConnectionState`] current
//! - Answer "is the store usable" without I/O on the request path
//!
//! # Design Decisions
//! - Failures are absorbed into the state, never propagated to callers of `is_usable`
//! - No retry loop here; reconnection is the driver's job
//! - Usable means tracked state is `Connected` AND the driver reports ready

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::store::driver::{DriverError, DriverEvent, SessionInfo, StoreDriver};
use crate::store::state::{ConnectionState, StateCell};

/// Why a connection attempt did not produce a session.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No connection target was configured.
    #[error("store connection target is not configured")]
    MissingTarget,

    /// The driver failed to establish a session.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

struct Inner {
    state: StateCell,
    driver: Arc<dyn StoreDriver>,
    listening: AtomicBool,
    // Never sent on; the listener sees it close when the last handle drops
    alive: watch::Sender<()>,
}

/// Tracks availability of the backing store.
///
/// Cheap to clone; all clones share the same state cell.
#[derive(Clone)]
pub struct ConnectionTracker {
    inner: Arc<Inner>,
}

impl ConnectionTracker {
    /// Create a tracker in the `Disconnected` state.
    pub fn new(driver: Arc<dyn StoreDriver>) -> Self {
        metrics::record_store_connected(false);
        Self {
            inner: Arc::new(Inner {
                state: StateCell::new(),
                driver,
                listening: AtomicBool::new(false),
                alive: watch::channel(()).0,
            }),
        }
    }

    /// Current tracked state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.load()
    }

    /// True only when the tracked state is `Connected` and the driver is ready.
    pub fn is_usable(&self) -> bool {
        self.state() == ConnectionState::Connected && self.inner.driver.is_ready()
    }

    /// Start connecting in the background and return immediately.
    pub fn initiate_connection(&self, target: Option<String>) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            // Outcome is already logged and recorded in the state
            let _ = tracker.connect(target.as_deref()).await;
        })
    }

    /// Attempt to connect to `target`.
    ///
    /// On success the tracker starts following the driver's lifecycle events.
    pub async fn connect(&self, target: Option<&str>) -> Result<SessionInfo, ConnectError> {
        let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) else {
            self.transition(ConnectionState::Disconnected);
            tracing::error!("Store connection target is not configured (set MONGO_URI)");
            tracing::warn!("Gateway will keep serving; store-backed routes answer 503");
            return Err(ConnectError::MissingTarget);
        };

        self.transition(ConnectionState::Connecting);

        // Subscribe first so nothing raised during the handshake is missed
        let events = self.inner.driver.subscribe();

        match self.inner.driver.connect(target).await {
            Ok(session) => {
                tracing::info!(hosts = %session.hosts, "Store connected");
                self.transition(ConnectionState::Connected);
                self.listen(events);
                Ok(session)
            }
            Err(e) => {
                tracing::error!(error = %e, "Store connection failed");
                tracing::warn!("Gateway will keep serving; check the store connection string");
                self.transition(ConnectionState::Disconnected);
                Err(e.into())
            }
        }
    }

    /// Driver reported a session error.
    pub fn on_error(&self, error: &str) {
        tracing::error!(error = %error, "Store connection error");
        self.transition(ConnectionState::Disconnected);
    }

    /// Driver reported the session as lost.
    pub fn on_disconnected(&self) {
        tracing::warn!("Store disconnected");
        self.transition(ConnectionState::Disconnected);
    }

    /// Driver re-established the session.
    pub fn on_reconnected(&self) {
        tracing::info!("Store reconnected");
        self.transition(ConnectionState::Connected);
    }

    fn transition(&self, next: ConnectionState) {
        let previous = self.inner.state.replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Store state changed");
            metrics::record_store_connected(next == ConnectionState::Connected);
        }
    }

    fn dispatch(&self, event: DriverEvent) {
        metrics::record_store_event(event.kind());
        match event {
            DriverEvent::Error(message) => self.on_error(&message),
            DriverEvent::Disconnected => self.on_disconnected(),
            DriverEvent::Reconnected => self.on_reconnected(),
        }
    }

    /// Spawn the event listener once per tracker.
    fn listen(&self, mut events: broadcast::Receiver<DriverEvent>) {
        if self.inner.listening.swap(true, Ordering::AcqRel) {
            return;
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let mut alive = self.inner.alive.subscribe();
        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    received = events.recv() => received,
                    _ = alive.changed() => {
                        tracing::debug!("Store event listener stopping; tracker dropped");
                        break;
                    }
                };

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let tracker = ConnectionTracker { inner };

                match received {
                    Ok(event) => tracker.dispatch(event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Store event listener lagged; events dropped");
                    }
                    Err(RecvError::Closed) => {
                        tracing::warn!("Store driver event stream closed");
                        tracker.transition(ConnectionState::Disconnected);
                        tracker.inner.listening.store(false, Ordering::Release);
                        break;
                    }
                }
            }
        });
    }
}

impl std::fmt::Debug for ConnectionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTracker")
            .field("state", &self.state())
            .field("driver_ready", &self.inner.driver.is_ready())
            .finish()
    }
}
