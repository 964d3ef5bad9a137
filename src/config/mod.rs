//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, or defaults)
//!     → loader.rs (environment overrides: MONGO_URI, PORT, FRONTEND_URL, NODE_ENV)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - A missing store target is valid; the gateway runs degraded

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::{
    CorsConfig, Environment, HealthConfig, ListenerConfig, ObservabilityConfig, RouteConfig,
    StoreConfig, TimeoutConfig,
};
