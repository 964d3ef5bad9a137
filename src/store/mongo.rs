//! MongoDB session driver.
//!
//! # Responsibilities
//! - Parse the connection string and open a `mongodb::Client`
//! - Prove the session with an authenticated `ping` before reporting ready
//! - Turn the client's heartbeat outcomes into lifecycle events
//!
//! # Design Decisions
//! - Readiness follows heartbeats: ready while at least one server answers
//! - Readiness is cleared *before* `Error`/`Disconnected` are published, so the
//!   tracker's predicate turns false even before the event is processed
//! - A silent network loss surfaces as a failed heartbeat within
//!   `heartbeat_interval_ms` plus `connect_timeout_ms`
//! - Heartbeats seen before the first successful ping never publish events
//! - On process shutdown the client is dropped and readiness cleared

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use mongodb::bson::doc;
use mongodb::error::ErrorKind;
use mongodb::event::sdam::SdamEvent;
use mongodb::event::EventHandler;
use mongodb::options::ClientOptions;
use mongodb::Client;
use tokio::sync::broadcast;

use crate::config::StoreConfig;
use crate::lifecycle::Shutdown;
use crate::store::driver::{DriverError, DriverEvent, SessionInfo, StoreDriver, EVENT_CHANNEL_CAPACITY};

/// Driver backed by the official MongoDB client.
pub struct MongoStoreDriver {
    config: StoreConfig,
    watch: Arc<SessionWatch>,
    client: Arc<Mutex<Option<Client>>>,
    shutdown: Shutdown,
    closer_started: AtomicBool,
}

impl MongoStoreDriver {
    pub fn new(config: StoreConfig, shutdown: Shutdown) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            watch: Arc::new(SessionWatch::new(events)),
            client: Arc::new(Mutex::new(None)),
            shutdown,
            closer_started: AtomicBool::new(false),
        }
    }

    async fn establish(&self, target: &str) -> Result<SessionInfo, DriverError> {
        let mut options = ClientOptions::parse(target)
            .await
            .map_err(|e| DriverError::InvalidTarget(e.to_string()))?;

        let hosts = options
            .hosts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);

        options.app_name.get_or_insert_with(|| "store-gateway".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.heartbeat_freq = Some(Duration::from_millis(self.config.heartbeat_interval_ms));

        // A fresh session starts from scratch; drop whatever an earlier attempt left
        self.watch.reset();
        self.client.lock().unwrap_or_else(PoisonError::into_inner).take();

        let watch = self.watch.clone();
        options.sdam_event_handler = Some(EventHandler::callback(move |event: SdamEvent| {
            match event {
                SdamEvent::ServerHeartbeatSucceeded(beat) => {
                    watch.observe(Heartbeat::Succeeded {
                        server: beat.server_address.to_string(),
                    });
                }
                SdamEvent::ServerHeartbeatFailed(beat) => {
                    watch.observe(Heartbeat::Failed {
                        server: beat.server_address.to_string(),
                        error: beat.failure.to_string(),
                    });
                }
                _ => {}
            }
        }));

        let client = Client::with_options(options).map_err(|e| DriverError::InvalidTarget(e.to_string()))?;

        tracing::debug!(hosts = %hosts, "Pinging store");
        if let Err(e) = client.database("admin").run_command(doc! { "ping": 1 }).await {
            self.watch.reset();
            return Err(match e.kind.as_ref() {
                ErrorKind::ServerSelection { .. } => DriverError::Unreachable {
                    hosts,
                    after: timeout,
                    reason: e.to_string(),
                },
                _ => DriverError::Rejected {
                    hosts,
                    reason: e.to_string(),
                },
            });
        }

        self.watch.mark_established();
        *self.client.lock().unwrap_or_else(PoisonError::into_inner) = Some(client);
        self.spawn_closer();

        Ok(SessionInfo { hosts })
    }

    /// Release the client on process shutdown. Spawned once per driver.
    fn spawn_closer(&self) {
        if self.closer_started.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut shutdown = self.shutdown.subscribe();
        let watch = self.watch.clone();
        let client = self.client.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            watch.reset();
            client.lock().unwrap_or_else(PoisonError::into_inner).take();
            tracing::debug!("Store client released");
        });
    }
}

impl StoreDriver for MongoStoreDriver {
    fn connect<'a>(&'a self, target: &'a str) -> BoxFuture<'a, Result<SessionInfo, DriverError>> {
        Box::pin(self.establish(target))
    }

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.watch.events.subscribe()
    }

    fn is_ready(&self) -> bool {
        self.watch.is_ready()
    }
}

/// Outcome of one server heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Heartbeat {
    Succeeded { server: String },
    Failed { server: String, error: String },
}

/// Readiness bookkeeping fed by heartbeat outcomes.
struct SessionWatch {
    ready: AtomicBool,
    established: AtomicBool,
    answering: Mutex<HashSet<String>>,
    events: broadcast::Sender<DriverEvent>,
}

impl SessionWatch {
    fn new(events: broadcast::Sender<DriverEvent>) -> Self {
        Self {
            ready: AtomicBool::new(false),
            established: AtomicBool::new(false),
            answering: Mutex::new(HashSet::new()),
            events,
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn mark_established(&self) {
        self.established.store(true, Ordering::Release);
        self.ready.store(true, Ordering::Release);
    }

    fn reset(&self) {
        self.established.store(false, Ordering::Release);
        self.ready.store(false, Ordering::Release);
        self.answering.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn observe(&self, beat: Heartbeat) {
        let mut answering = self.answering.lock().unwrap_or_else(PoisonError::into_inner);

        match beat {
            Heartbeat::Succeeded { server } => {
                answering.insert(server);
                if self.established.load(Ordering::Acquire) && !self.ready.swap(true, Ordering::AcqRel) {
                    tracing::debug!(servers = answering.len(), "Store heartbeat recovered");
                    self.publish(DriverEvent::Reconnected);
                }
            }
            Heartbeat::Failed { server, error } => {
                answering.remove(&server);
                tracing::debug!(server = %server, error = %error, "Store heartbeat failed");
                if answering.is_empty() && self.ready.swap(false, Ordering::AcqRel) {
                    self.publish(DriverEvent::Error(error));
                    self.publish(DriverEvent::Disconnected);
                }
            }
        }
    }

    fn publish(&self, event: DriverEvent) {
        // No subscribers is fine; the tracker may not be listening yet
        let _ = self.events.send(event);
    }
}
