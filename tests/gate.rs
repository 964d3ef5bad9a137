//! Store gate tests, driven through the full router.

use std::sync::atomic::Ordering;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use store_gateway::http::middleware::{evaluate, GateDecision, RejectReason};
use store_gateway::http::GatewayServer;
use store_gateway::store::ConnectionTracker;

mod common;
use common::{gateway_config, start_mock_backend, FakeDriver};

const TARGET: Option<&str> = Some("mongodb://fake:27017/library");

async fn send(router: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn rejection_body() -> Value {
    json!({
        "message": "Database is not connected. Please check your MongoDB connection string in the .env file.",
        "error": "DATABASE_NOT_CONNECTED"
    })
}

#[tokio::test]
async fn test_gate_decision() {
    let driver = FakeDriver::accepting();
    let tracker = ConnectionTracker::new(driver);

    assert_eq!(evaluate(&tracker), GateDecision::Reject(RejectReason::DatabaseNotConnected));
    assert_eq!(RejectReason::DatabaseNotConnected.code(), "DATABASE_NOT_CONNECTED");

    tracker.connect(TARGET).await.unwrap();
    assert_eq!(evaluate(&tracker), GateDecision::Proceed);
}

#[tokio::test]
async fn test_rejects_without_reaching_upstream() {
    let (upstream, hits) = start_mock_backend().await;
    let tracker = ConnectionTracker::new(FakeDriver::accepting());
    let router = GatewayServer::new(gateway_config(upstream), tracker).router();

    for uri in ["/api/books", "/api/books/42", "/api/books/42/issue?member=7"] {
        let (status, _, body) = send(&router, uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), rejection_body());
    }

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_connect_yields_503() {
    let (upstream, hits) = start_mock_backend().await;
    let tracker = ConnectionTracker::new(FakeDriver::refusing());
    assert!(tracker.connect(TARGET).await.is_err());

    let router = GatewayServer::new(gateway_config(upstream), tracker).router();
    let (status, _, body) = send(&router, "/api/books/1").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "DATABASE_NOT_CONNECTED");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_proceeds_exactly_once_when_usable() {
    let (upstream, hits) = start_mock_backend().await;
    let tracker = ConnectionTracker::new(FakeDriver::accepting());
    tracker.connect(TARGET).await.unwrap();

    let router = GatewayServer::new(gateway_config(upstream), tracker).router();
    let (status, _, body) = send(&router, "/api/books/42?expand=author").await;

    assert_eq!(status, StatusCode::OK);
    // Upstream echoes the request target it received
    assert_eq!(String::from_utf8(body).unwrap(), "/api/books/42?expand=author");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_trailing_slash_on_prefix_is_gated() {
    let (upstream, hits) = start_mock_backend().await;
    let tracker = ConnectionTracker::new(FakeDriver::accepting());
    let router = GatewayServer::new(gateway_config(upstream), tracker.clone()).router();

    let (status, _, body) = send(&router, "/api/books/").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), rejection_body());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    tracker.connect(TARGET).await.unwrap();
    let (status, _, body) = send(&router, "/api/books/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "/api/books/");

    let (status, _, body) = send(&router, "/api/public/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "/api/public/");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_ungated_group_unaffected_by_store() {
    let (upstream, hits) = start_mock_backend().await;
    let tracker = ConnectionTracker::new(FakeDriver::refusing());
    let router = GatewayServer::new(gateway_config(upstream), tracker).router();

    let (status, _, body) = send(&router, "/api/public/announcements").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "/api/public/announcements");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disconnect_then_reconnect() {
    let (upstream, hits) = start_mock_backend().await;
    let tracker = ConnectionTracker::new(FakeDriver::accepting());
    tracker.connect(TARGET).await.unwrap();
    let router = GatewayServer::new(gateway_config(upstream), tracker.clone()).router();

    tracker.on_disconnected();
    let (status, _, _) = send(&router, "/api/books").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    tracker.on_reconnected();
    let (status, _, _) = send(&router, "/api/books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stale_readiness_rejects() {
    let (upstream, hits) = start_mock_backend().await;
    let driver = FakeDriver::accepting();
    let tracker = ConnectionTracker::new(driver.clone());
    tracker.connect(TARGET).await.unwrap();
    let router = GatewayServer::new(gateway_config(upstream), tracker).router();

    // Driver lost the session but has not published an event yet
    driver.set_ready(false);

    let (status, _, _) = send(&router, "/api/books").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_health_reports_store() {
    let (upstream, _) = start_mock_backend().await;
    let tracker = ConnectionTracker::new(FakeDriver::accepting());
    let router = GatewayServer::new(gateway_config(upstream), tracker.clone()).router();

    let (status, _, body) = send(&router, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["message"], "Server is running");
    assert_eq!(report["status"], "ok");
    assert_eq!(report["database"], "disconnected");
    let timestamp = report["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    assert!(timestamp.ends_with('Z'));

    tracker.connect(TARGET).await.unwrap();
    let (_, _, body) = send(&router, "/api/health").await;
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["database"], "connected");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (upstream, _) = start_mock_backend().await;
    let tracker = ConnectionTracker::new(FakeDriver::accepting());
    let router = GatewayServer::new(gateway_config(upstream), tracker).router();

    let (status, _, body) = send(&router, "/api/unknown").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_rejection_carries_request_id() {
    let (upstream, _) = start_mock_backend().await;
    let tracker = ConnectionTracker::new(FakeDriver::accepting());
    let router = GatewayServer::new(gateway_config(upstream), tracker).router();

    let (_, headers, _) = send(&router, "/api/books").await;
    assert!(headers.contains_key("x-request-id"));

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/books")
                .header("x-request-id", "req-7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-7");
}

#[tokio::test]
async fn test_unreachable_upstream_is_502() {
    // Reserve a port, then free it so nothing listens there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let tracker = ConnectionTracker::new(FakeDriver::accepting());
    tracker.connect(TARGET).await.unwrap();
    let router = GatewayServer::new(gateway_config(dead), tracker).router();

    let (status, _, body) = send(&router, "/api/books").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "UPSTREAM_UNAVAILABLE");
}
