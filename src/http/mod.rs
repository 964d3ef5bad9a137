//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, global layers: trace, request ID, CORS, timeout, panics)
//!     → health.rs                      (health path)
//!     → middleware/store_gate.rs       (route groups with requires_store)
//!     → proxy.rs (forward to the group's upstream)
//!     → response.rs (gateway-generated JSON errors)
//!     → Send to client
//! ```

pub mod health;
pub mod middleware;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::ApiError;
pub use server::GatewayServer;
