//! Health endpoint.
//!
//! Always answers 200 so the process is observable while the store is down;
//! store availability is reported in the `database` field.

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::store::ConnectionTracker;

/// Store availability as reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

/// Health report body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub message: &'static str,
    pub status: &'static str,
    pub database: DatabaseStatus,
    pub timestamp: String,
}

impl HealthReport {
    pub fn from_tracker(tracker: &ConnectionTracker) -> Self {
        let database = if tracker.is_usable() {
            DatabaseStatus::Connected
        } else {
            DatabaseStatus::Disconnected
        };

        Self {
            message: "Server is running",
            status: "ok",
            database,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

pub async fn health(State(tracker): State<ConnectionTracker>) -> Json<HealthReport> {
    Json(HealthReport::from_tracker(&tracker))
}
