//! Store connection state.
//!
//! # States
//! - Disconnected: no usable session (initial state)
//! - Connecting: initial connection attempt in flight
//! - Connected: session established and not reported lost
//!
//! # State Transitions
//! ```text
//! Disconnected → Connecting: connection attempt starts
//! Connecting   → Connected: attempt succeeds
//! Connecting   → Disconnected: attempt fails
//! Connected    → Disconnected: driver reports error or disconnect
//! Disconnected → Connected: driver reports reconnect
//! ```
//!
//! # Design Decisions
//! - Single atomic byte, no locks on the request path
//! - Writes are whole-value replacements; swap returns the previous value for logging

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Connection state of the backing store.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

impl From<u8> for ConnectionState {
    fn from(val: u8) -> Self {
        match val {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomically readable and writable holder for a [`ConnectionState`].
#[derive(Debug)]
pub struct StateCell {
    value: AtomicU8,
}

impl StateCell {
    /// Create a cell starting in `Disconnected`.
    pub fn new() -> Self {
        Self {
            value: AtomicU8::new(ConnectionState::Disconnected as u8),
        }
    }

    pub fn load(&self) -> ConnectionState {
        ConnectionState::from(self.value.load(Ordering::Acquire))
    }

    /// Replace the current state, returning the previous one.
    pub fn replace(&self, next: ConnectionState) -> ConnectionState {
        ConnectionState::from(self.value.swap(next as u8, Ordering::AcqRel))
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
