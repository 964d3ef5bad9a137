//! Backing store connectivity subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     tracker.initiate_connection(target)   (spawned, never awaited)
//!     → driver.connect(target)
//!     → state.rs: Connecting → Connected | Disconnected
//!
//! Runtime (driver.rs events, out of band):
//!     Error | Disconnected → Disconnected
//!     Reconnected          → Connected
//!
//! Request path:
//!     gate → tracker.is_usable()
//!          = state == Connected && driver.is_ready()
//! ```
//!
//! # Design Decisions
//! - The driver is a trait object so tests plug in a fake
//! - mongo.rs is the production driver; the MongoDB client owns reconnection

pub mod driver;
pub mod mongo;
pub mod state;
pub mod tracker;

pub use driver::{DriverError, DriverEvent, SessionInfo, StoreDriver};
pub use mongo::MongoStoreDriver;
pub use state::{ConnectionState, StateCell};
pub use tracker::{ConnectError, ConnectionTracker};
