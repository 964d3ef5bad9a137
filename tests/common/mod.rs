//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};

use store_gateway::config::{GatewayConfig, RouteConfig};
use store_gateway::store::{DriverError, DriverEvent, SessionInfo, StoreDriver};

/// In-memory store driver. Lifecycle events and readiness are set by the test.
pub struct FakeDriver {
    ready: AtomicBool,
    refuse: bool,
    hold: Option<Arc<Notify>>,
    events: Mutex<Option<broadcast::Sender<DriverEvent>>>,
    pub connects: AtomicUsize,
}

#[allow(dead_code)]
impl FakeDriver {
    fn build(refuse: bool, hold: Option<Arc<Notify>>) -> Arc<Self> {
        let (tx, _) = broadcast::channel(16);
        Arc::new(Self {
            ready: AtomicBool::new(false),
            refuse,
            hold,
            events: Mutex::new(Some(tx)),
            connects: AtomicUsize::new(0),
        })
    }

    /// Driver whose connect succeeds immediately.
    pub fn accepting() -> Arc<Self> {
        Self::build(false, None)
    }

    /// Driver whose connect fails with "connection refused".
    pub fn refusing() -> Arc<Self> {
        Self::build(true, None)
    }

    /// Driver whose connect succeeds only after `release` is notified.
    pub fn held(release: Arc<Notify>) -> Arc<Self> {
        Self::build(false, Some(release))
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn emit(&self, event: DriverEvent) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Drop the event sender, closing every subscription.
    pub fn close_events(&self) {
        self.events.lock().unwrap().take();
    }

    /// Live subscriptions to the event channel.
    pub fn subscriber_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, |tx| tx.receiver_count())
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl StoreDriver for FakeDriver {
    fn connect<'a>(&'a self, _target: &'a str) -> BoxFuture<'a, Result<SessionInfo, DriverError>> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            if self.refuse {
                return Err(DriverError::Unreachable {
                    hosts: "fake:27017".into(),
                    after: Duration::from_millis(10),
                    reason: "connection refused".into(),
                });
            }
            self.ready.store(true, Ordering::SeqCst);
            Ok(SessionInfo {
                hosts: "fake:27017".into(),
            })
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        match self.events.lock().unwrap().as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
#[allow(dead_code)]
pub async fn wait_until<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Mock upstream that answers 200 with the request target as body.
///
/// Returns its address and a counter of requests served.
#[allow(dead_code)]
pub async fn start_mock_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let counter = counter.clone();
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        // Read the request head
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }
                        counter.fetch_add(1, Ordering::SeqCst);

                        let head = String::from_utf8_lossy(&buf);
                        let target = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("")
                            .to_string();

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            target.len(),
                            target
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}

/// Config with a gated `/api/books` group and an ungated `/api/public` group,
/// both forwarding to `upstream`.
#[allow(dead_code)]
pub fn gateway_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;
    config.routes = vec![
        RouteConfig {
            name: "books".into(),
            path_prefix: "/api/books".into(),
            upstream: upstream.to_string(),
            requires_store: true,
        },
        RouteConfig {
            name: "public".into(),
            path_prefix: "/api/public".into(),
            upstream: upstream.to_string(),
            requires_store: false,
        },
    ];
    config
}
