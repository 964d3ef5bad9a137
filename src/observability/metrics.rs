//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_store_connected` (gauge): 1 while the tracked state is Connected
//! - `gateway_store_events_total` (counter): driver lifecycle events by kind
//! - `gateway_gate_rejections_total` (counter): requests refused with 503
//! - `gateway_upstream_requests_total` (counter): forwarded requests by route, status
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Prometheus exporter serves its own listener, separate from the gateway

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_store_connected(connected: bool) {
    gauge!("gateway_store_connected").set(if connected { 1.0 } else { 0.0 });
}

pub fn record_store_event(kind: &'static str) {
    counter!("gateway_store_events_total", "event" => kind).increment(1);
}

pub fn record_gate_rejection() {
    counter!("gateway_gate_rejections_total").increment(1);
}

pub fn record_upstream_request(route: &str, status: u16) {
    counter!(
        "gateway_upstream_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
