//! Request filters.
//!
//! - store_gate.rs: per route group, refuses work while the store is unusable
//! - cors.rs: global cross-origin policy

pub mod cors;
pub mod store_gate;

pub use store_gate::{evaluate, require_store, GateDecision, RejectReason};
