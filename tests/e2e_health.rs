//! E2E tests for health check, metrics and basic server behaviour

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_health_via_client() {
    let server = TestServer::new().await;

    let health = server.api_client().health().await.unwrap();
    assert_eq!(health.status, "OK");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::new().await;
    server.sign_up("Metric").await;

    let response = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("buddyscript_http_requests_total"));
    assert!(body.contains("buddyscript_app_uptime_seconds"));
}

#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/health"))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/unknown/route"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let missing_upload = server
        .client
        .get(server.url("/uploads/post-nothing.png"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_upload.status(), 404);
}
