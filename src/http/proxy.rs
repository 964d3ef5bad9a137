//! Forwarding of route groups to their upstream server.
//!
//! # Responsibilities
//! - Rewrite the request URI to the group's upstream, keeping path and query
//! - Stream request and response bodies without buffering
//! - Map upstream failures to 502 and slow upstreams to 504
//!
//! # Design Decisions
//! - No retries: a non-idempotent request may already have side effects upstream
//! - Hop-by-hop headers are stripped before forwarding

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{
        header,
        uri::{Authority, Scheme},
        HeaderMap, Request, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::http::request::request_id;
use crate::http::response::ApiError;
use crate::observability::metrics;

/// HTTP client shared by all route groups.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// State of one route group.
#[derive(Clone)]
pub struct Upstream {
    pub route: Arc<str>,
    pub authority: Authority,
    pub client: UpstreamClient,
    pub timeout: Duration,
}

const HOP_BY_HOP: [header::HeaderName; 6] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// Build the upstream URI from the incoming request URI.
pub fn upstream_uri(authority: &Authority, original: &Uri) -> Result<Uri, axum::http::Error> {
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(authority.clone())
        .path_and_query(path_and_query)
        .build()
}

/// Forward the request to the group's upstream.
pub async fn forward(
    State(upstream): State<Upstream>,
    OriginalUri(original): OriginalUri,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();

    let (mut parts, body) = request.into_parts();

    parts.uri = match upstream_uri(&upstream.authority, &original) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return ApiError::internal(None).into_response();
        }
    };
    strip_hop_by_hop(&mut parts.headers);
    // Let the client set Host for the upstream authority
    parts.headers.remove(header::HOST);

    tracing::debug!(
        request_id = %request_id,
        route = %upstream.route,
        method = %parts.method,
        uri = %parts.uri,
        "Forwarding request"
    );

    let outbound = Request::from_parts(parts, body);

    match tokio::time::timeout(upstream.timeout, upstream.client.request(outbound)).await {
        Ok(Ok(response)) => {
            let status = response.status();
            metrics::record_upstream_request(&upstream.route, status.as_u16());
            tracing::debug!(
                request_id = %request_id,
                route = %upstream.route,
                status = %status,
                elapsed = ?start_time.elapsed(),
                "Upstream responded"
            );

            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, route = %upstream.route, error = %e, "Upstream error");
            let err = ApiError::upstream_unavailable();
            metrics::record_upstream_request(&upstream.route, err.status().as_u16());
            err.into_response()
        }
        Err(_) => {
            tracing::warn!(request_id = %request_id, route = %upstream.route, timeout = ?upstream.timeout, "Upstream timed out");
            let err = ApiError::upstream_timeout();
            metrics::record_upstream_request(&upstream.route, err.status().as_u16());
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let authority = Authority::from_str("127.0.0.1:3000").unwrap();
        let original: Uri = "/api/books/42?expand=author".parse().unwrap();
        let uri = upstream_uri(&authority, &original).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:3000/api/books/42?expand=author");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, "close".parse().unwrap());
        headers.insert("keep-alive", "timeout=5".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }
}
