//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect route prefixes that would collide in the router
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: &GatewayConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// Lowest heartbeat interval the MongoDB client accepts.
pub const MIN_HEARTBEAT_INTERVAL_MS: u64 = 500;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("health.path '{0}' must start with '/'")]
    HealthPath(String),

    #[error("route '{name}': path_prefix '{prefix}' {reason}")]
    RoutePrefix {
        name: String,
        prefix: String,
        reason: &'static str,
    },

    #[error("route '{name}': upstream '{upstream}' is not a host:port authority")]
    Upstream { name: String, upstream: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("store.heartbeat_interval_ms must be at least {MIN_HEARTBEAT_INTERVAL_MS}, got {0}")]
    HeartbeatInterval(u64),
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if !config.health.path.starts_with('/') {
        errors.push(ValidationError::HealthPath(config.health.path.clone()));
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        let prefix_error = |reason| ValidationError::RoutePrefix {
            name: route.name.clone(),
            prefix: route.path_prefix.clone(),
            reason,
        };

        if !route.path_prefix.starts_with('/') {
            errors.push(prefix_error("must start with '/'"));
        } else if route.path_prefix == "/" {
            errors.push(prefix_error("cannot be the root"));
        } else if route.path_prefix.ends_with('/') {
            errors.push(prefix_error("must not end with '/'"));
        } else if route.path_prefix.contains(['{', '}', '*']) {
            errors.push(prefix_error("must not contain route parameters"));
        } else if !seen.insert(route.path_prefix.as_str()) {
            errors.push(prefix_error("is used by another route"));
        } else if config.health.path == route.path_prefix
            || config.health.path.starts_with(&format!("{}/", route.path_prefix))
        {
            errors.push(prefix_error("shadows the health endpoint"));
        } else if config.routes.iter().any(|other| {
            other.name != route.name && route.path_prefix.starts_with(&format!("{}/", other.path_prefix))
        }) {
            errors.push(prefix_error("lies under another route's prefix"));
        }

        let authority_ok = Authority::from_str(&route.upstream)
            .map(|a| a.port_u16().is_some() && !a.host().is_empty() && !route.upstream.contains('@'))
            .unwrap_or(false);
        if !authority_ok {
            errors.push(ValidationError::Upstream {
                name: route.name.clone(),
                upstream: route.upstream.clone(),
            });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.upstream_secs"));
    }
    if config.store.connect_timeout_ms == 0 {
        errors.push(ValidationError::Zero("store.connect_timeout_ms"));
    }
    if config.store.heartbeat_interval_ms < MIN_HEARTBEAT_INTERVAL_MS {
        errors.push(ValidationError::HeartbeatInterval(config.store.heartbeat_interval_ms));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
