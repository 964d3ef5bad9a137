//! Configuration loading from disk and environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{Environment, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Store connection string.
pub const ENV_CONNECTION_TARGET: &str = "MONGO_URI";
/// Listener port.
pub const ENV_PORT: &str = "PORT";
/// Origin of the frontend, added to the CORS allow list.
pub const ENV_FRONTEND_URL: &str = "FRONTEND_URL";
/// `development` relaxes CORS and exposes error details.
pub const ENV_ENVIRONMENT: &str = "NODE_ENV";

/// Load configuration from `path` (or defaults), apply process environment
/// overrides, and validate.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides read through `lookup`.
///
/// Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(target) = get(ENV_CONNECTION_TARGET) {
        config.store.connection_target = Some(target);
    }

    if let Some(port) = get(ENV_PORT) {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            key: ENV_PORT,
            value: port.clone(),
        })?;
        let mut addr: SocketAddr = config
            .listener
            .bind_address
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));
        addr.set_port(port);
        config.listener.bind_address = addr.to_string();
    }

    if let Some(origin) = get(ENV_FRONTEND_URL) {
        let origin = origin.trim().trim_end_matches('/').to_string();
        if !config.cors.allowed_origins.contains(&origin) {
            config.cors.allowed_origins.insert(0, origin);
        }
    }

    if let Some(env) = get(ENV_ENVIRONMENT) {
        config.environment = match env.trim() {
            "development" => Environment::Development,
            _ => Environment::Production,
        };
    }

    Ok(())
}
