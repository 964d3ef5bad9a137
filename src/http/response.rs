//! JSON error responses produced by the gateway itself.
//!
//! # Responsibilities
//! - One body shape for every gateway-generated error: `{ message, error }`
//! - Fixed 503 payload for requests refused while the store is unusable
//! - Upstream failures mapped to 502/504
//!
//! # Design Decisions
//! - `error` is a stable machine-readable code; `message` is for humans
//! - Field order is part of the wire contract (message first)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Human-readable text of the store-unavailable rejection.
pub const DATABASE_NOT_CONNECTED_MESSAGE: &str =
    "Database is not connected. Please check your MongoDB connection string in the .env file.";

/// Reason code of the store-unavailable rejection.
pub const DATABASE_NOT_CONNECTED: &str = "DATABASE_NOT_CONNECTED";

/// Body of every gateway-generated error.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An error response with status and JSON body.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                error: Some(code.into()),
            },
        }
    }

    /// Refusal issued by the store gate.
    pub fn store_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            DATABASE_NOT_CONNECTED_MESSAGE,
            DATABASE_NOT_CONNECTED,
        )
    }

    pub fn upstream_unavailable() -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            "Upstream service is unavailable",
            "UPSTREAM_UNAVAILABLE",
        )
    }

    pub fn upstream_timeout() -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            "Upstream service did not respond in time",
            "UPSTREAM_TIMEOUT",
        )
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Route not found", "NOT_FOUND")
    }

    /// Generic 500. `detail` is only exposed in development.
    pub fn internal(detail: Option<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                message: "Internal server error".to_string(),
                error: detail,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Fallback for paths no route group owns.
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}
