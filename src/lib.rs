//! Store-aware HTTP gateway library.
//!
//! Tracks availability of the backing store and refuses store-backed
//! requests with 503 while it is unusable.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod store;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use store::{ConnectionState, ConnectionTracker, MongoStoreDriver, StoreDriver};
