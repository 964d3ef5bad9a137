//! Cross-origin policy.
//!
//! Origins are matched exactly or against a pattern with a single `*`
//! (e.g., `https://*.app.github.dev`). Development mode allows every origin.
//! Disallowed origins get no CORS headers; the browser enforces the rest.

use std::sync::Arc;

use axum::http::{request::Parts, HeaderValue};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::{CorsConfig, Environment};

/// A single allowed-origin entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginRule {
    Exact(String),
    Wildcard { prefix: String, suffix: String },
}

impl OriginRule {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_end_matches('/');
        match raw.split_once('*') {
            Some((prefix, suffix)) if !suffix.contains('*') => OriginRule::Wildcard {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            },
            _ => OriginRule::Exact(raw.to_string()),
        }
    }

    pub fn matches(&self, origin: &str) -> bool {
        match self {
            OriginRule::Exact(expected) => origin == expected,
            OriginRule::Wildcard { prefix, suffix } => {
                origin.len() > prefix.len() + suffix.len()
                    && origin.starts_with(prefix.as_str())
                    && origin.ends_with(suffix.as_str())
                    // The wildcard covers one host label set, never a path
                    && !origin[prefix.len()..origin.len() - suffix.len()].contains('/')
            }
        }
    }
}

/// Compiled origin policy.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allow_any: bool,
    rules: Vec<OriginRule>,
}

impl OriginPolicy {
    pub fn new(config: &CorsConfig, environment: Environment) -> Self {
        Self {
            allow_any: environment.is_development(),
            rules: config.allowed_origins.iter().map(|o| OriginRule::parse(o)).collect(),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allow_any || self.rules.iter().any(|rule| rule.matches(origin))
    }
}

/// Build the CORS layer. Credentials are allowed, so origins, methods, and
/// headers are mirrored rather than wildcarded.
pub fn cors_layer(config: &CorsConfig, environment: Environment) -> CorsLayer {
    let policy = Arc::new(OriginPolicy::new(config, environment));

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
            origin.to_str().map(|o| policy.allows(o)).unwrap_or(false)
        }))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_rule() {
        let rule = OriginRule::parse("http://localhost:5173/");
        assert_eq!(rule, OriginRule::Exact("http://localhost:5173".into()));
        assert!(rule.matches("http://localhost:5173"));
        assert!(!rule.matches("http://localhost:5174"));
    }

    #[test]
    fn test_wildcard_rule() {
        let rule = OriginRule::parse("https://*.app.github.dev");
        assert!(rule.matches("https://fuzzy-space-5173.app.github.dev"));
        assert!(!rule.matches("https://.app.github.dev"));
        assert!(!rule.matches("http://fuzzy.app.github.dev"));
        assert!(!rule.matches("https://evil.com/x.app.github.dev"));
    }

    #[test]
    fn test_development_allows_any_origin() {
        let config = CorsConfig::default();
        assert!(!OriginPolicy::new(&config, Environment::Production).allows("https://evil.com"));
        assert!(OriginPolicy::new(&config, Environment::Development).allows("https://evil.com"));
    }
}
