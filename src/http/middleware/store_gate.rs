//! Store gate middleware.
//! Refuses requests with 503 while the backing store is unusable.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::request_id;
use crate::http::response::{ApiError, DATABASE_NOT_CONNECTED};
use crate::observability::metrics;
use crate::store::ConnectionTracker;

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    DatabaseNotConnected,
}

impl RejectReason {
    /// Machine-readable reason code.
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::DatabaseNotConnected => DATABASE_NOT_CONNECTED,
        }
    }

    pub fn into_error(self) -> ApiError {
        match self {
            RejectReason::DatabaseNotConnected => ApiError::store_unavailable(),
        }
    }
}

/// Outcome of consulting the gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Reject(RejectReason),
}

/// Decide whether a store-backed request may proceed. No I/O.
pub fn evaluate(tracker: &ConnectionTracker) -> GateDecision {
    if tracker.is_usable() {
        GateDecision::Proceed
    } else {
        GateDecision::Reject(RejectReason::DatabaseNotConnected)
    }
}

/// Middleware for route groups that need the store.
///
/// Mount per group with `route_layer(middleware::from_fn_with_state(tracker, require_store))`.
pub async fn require_store(
    State(tracker): State<ConnectionTracker>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match evaluate(&tracker) {
        GateDecision::Proceed => next.run(request).await,
        GateDecision::Reject(reason) => {
            tracing::warn!(
                request_id = %request_id(&request),
                method = %request.method(),
                path = %request.uri().path(),
                state = %tracker.state(),
                reason = reason.code(),
                "Store unavailable, rejecting request"
            );
            metrics::record_gate_rejection();
            reason.into_error().into_response()
        }
    }
}
