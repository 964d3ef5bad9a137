//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health endpoint and route groups
//! - Mount the store gate on groups that need the store, and only those
//! - Wire up middleware (tracing, request ID, CORS, timeout, panic catching)
//! - Serve until shutdown is signalled

use std::any::Any;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::uri::Authority,
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, RouteConfig};
use crate::http::health::health;
use crate::http::middleware::{cors::cors_layer, require_store};
use crate::http::proxy::{forward, Upstream, UpstreamClient};
use crate::http::request::MakeRequestUuid;
use crate::http::response::{not_found, ApiError};
use crate::store::ConnectionTracker;

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a new HTTP server. `tracker` backs the health endpoint and the store gate.
    pub fn new(config: GatewayConfig, tracker: ConnectionTracker) -> Self {
        let router = Self::build_router(&config, tracker);
        Self { router, config }
    }

    /// The fully layered router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, tracker: ConnectionTracker) -> Router {
        let client: UpstreamClient = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let upstream_timeout = Duration::from_secs(config.timeouts.upstream_secs);

        let mut app = Router::new()
            .route(&config.health.path, get(health))
            .with_state(tracker.clone());

        for route in &config.routes {
            if let Some(group) = route_group(route, &tracker, client.clone(), upstream_timeout) {
                app = app.merge(group);
            }
        }

        let expose_panics = config.environment.is_development();

        app.fallback(not_found).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| panic_response(panic, expose_panics)))
                .layer(cors_layer(&config.cors, config.environment))
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        )
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Router for one route group, gated when it needs the store.
///
/// Serves the prefix itself, the prefix with a trailing slash and every
/// sub-path below it.
fn route_group(
    route: &RouteConfig,
    tracker: &ConnectionTracker,
    client: UpstreamClient,
    timeout: Duration,
) -> Option<Router> {
    let authority = match Authority::from_str(&route.upstream) {
        Ok(authority) => authority,
        Err(e) => {
            tracing::error!(route = %route.name, upstream = %route.upstream, error = %e, "Invalid upstream, route skipped");
            return None;
        }
    };

    let upstream = Upstream {
        route: Arc::from(route.name.as_str()),
        authority,
        client,
        timeout,
    };

    let prefix = route.path_prefix.as_str();
    let group = Router::new()
        .route(prefix, any(forward))
        .route(&format!("{}/", prefix), any(forward))
        .route(&format!("{}/{{*rest}}", prefix), any(forward))
        .with_state(upstream);

    let group = if route.requires_store {
        group.route_layer(middleware::from_fn_with_state(tracker.clone(), require_store))
    } else {
        group
    };

    tracing::info!(
        route = %route.name,
        prefix = %route.path_prefix,
        upstream = %route.upstream,
        requires_store = route.requires_store,
        "Route group mounted"
    );

    Some(group)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, expose: bool) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::internal(expose.then_some(detail)).into_response()
}
