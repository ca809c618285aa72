//! API integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// Test metrics endpoint (when enabled).
#[tokio::test]
async fn test_metrics_endpoint() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Metrics should return OK if enabled
    assert!(
        response.status() == StatusCode::OK || response.status() == StatusCode::NOT_FOUND
    );
}

/// Test rate limiting.
#[tokio::test]
#[ignore = "requires full app setup"]
async fn test_rate_limiting() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    // Make many requests quickly
    for i in 0..20 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/download")
                    .header("Content-Type", "application/json")
                    .header("X-Forwarded-For", "192.168.1.100")
                    .body(Body::from(
                        r#"{"url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            println!("Rate limited after {} requests", i + 1);
            return;
        }
    }

    // If we get here, rate limiting might not be working as expected
    // (or the limit is higher than 20 req/s)
}

/// Test CORS headers.
#[tokio::test]
async fn test_cors_headers() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/info")
                .header("Origin", "http://localhost:3000")
                .header("Access-Control-Request-Method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // CORS preflight should return OK or NO_CONTENT
    assert!(
        response.status() == StatusCode::OK || response.status() == StatusCode::NO_CONTENT
    );
}

/// Test security headers.
#[tokio::test]
async fn test_security_headers() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();

    // Check security headers are present
    assert!(headers.contains_key("X-Content-Type-Options"));
    assert!(headers.contains_key("X-Frame-Options"));
    assert!(headers.contains_key("X-Request-ID"));
}

/// Test that a malformed URL is rejected before a job is created.
#[tokio::test]
async fn test_download_rejects_bad_url() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/download")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"url":"https://example.com/not-youtube"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Helper to create a test router.
/// In a real setup, this would use test fixtures or mocks.
async fn create_test_router() -> axum::Router {
    use tgrab_api::{create_router, metrics, ApiConfig, AppState};

    // Try to create real state, fall back to minimal router
    let config = ApiConfig::from_env();

    match AppState::new(config).await {
        Ok(state) => {
            // The Prometheus recorder is process-global: install it once and
            // share the handle across every test in this binary.
            static METRICS_HANDLE: std::sync::OnceLock<
                metrics_exporter_prometheus::PrometheusHandle,
            > = std::sync::OnceLock::new();
            let metrics_handle = Some(METRICS_HANDLE.get_or_init(metrics::init_metrics).clone());
            create_router(state, metrics_handle)
        }
        Err(_) => {
            // Create a minimal router for basic tests
            use axum::routing::get;
            use axum::Json;
            use serde_json::json;

            axum::Router::new()
                .route("/health", get(|| async {
                    Json(json!({
                        "status": "healthy",
                        "version": env!("CARGO_PKG_VERSION")
                    }))
                }))
                .route("/metrics", get(|| async { "# No metrics" }))
        }
    }
}

/// Test REST download endpoint against a running server (basic).
#[tokio::test]
#[ignore = "requires full app setup"]
async fn test_download_endpoint_live() {
    dotenvy::dotenv().ok();

    // This test requires the server to be running.
    let base_url = std::env::var("TGRAB_TEST_API_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3001".to_string());

    let client = reqwest::Client::new();
    let request = client
        .post(format!("{}/api/download", base_url))
        .json(&serde_json::json!({
            "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "format": "mp3"
        }));

    match request.send().await {
        Ok(resp) => {
            println!("REST download endpoint responded with status {}", resp.status());
            assert_ne!(resp.status(), StatusCode::NOT_FOUND);
        }
        Err(e) => {
            println!("REST request failed (expected if server not running): {}", e);
        }
    }
}
