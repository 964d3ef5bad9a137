//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build tracker → spawn store connection → bind listener → serve
//!     (the store connection and the listener are independent)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain requests → stop store monitor
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Store availability never blocks or fails startup
//! - Only a listener bind failure is fatal

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, RunningGateway, StartupError};
