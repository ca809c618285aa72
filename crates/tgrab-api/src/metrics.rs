//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "tgrab_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "tgrab_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "tgrab_http_requests_in_flight";

    // WebSocket metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "tgrab_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "tgrab_ws_connections_active";
    pub const WS_MESSAGES_SENT: &str = "tgrab_ws_messages_sent_total";

    // Job metrics
    pub const DOWNLOADS_ACCEPTED_TOTAL: &str = "tgrab_downloads_accepted_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "tgrab_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record WebSocket connection.
pub fn record_ws_connection(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::WS_CONNECTIONS_TOTAL, &labels).increment(1);
}

/// Update active WebSocket connections gauge.
pub fn set_ws_active_connections(count: i64) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record WebSocket message sent.
pub fn record_ws_message_sent(endpoint: &str, message_type: &str) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("type", message_type.to_string()),
    ];
    counter!(names::WS_MESSAGES_SENT, &labels).increment(1);
}

/// Record a download job accepted over HTTP.
pub fn record_download_accepted(format: &str) {
    let labels = [("format", format.to_string())];
    counter!(names::DOWNLOADS_ACCEPTED_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (remove IDs, file names, etc.).
fn sanitize_path(path: &str) -> String {
    // Replace UUIDs (job ids in /ws/... and /downloads/...) with a placeholder
    let path = regex_lite::Regex::new(
        r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    )
    .unwrap()
    .replace_all(path, ":id");
    // Collapse artifact file names so every download fetch shares one label
    let path = regex_lite::Regex::new(r"/downloads/:id/.+")
        .unwrap()
        .replace_all(&path, "/downloads/:id/:file");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path(
                "/downloads/550e8400-e29b-41d4-a716-446655440000/Never Gonna Give You Up.mp4"
            ),
            "/downloads/:id/:file"
        );
        assert_eq!(
            sanitize_path("/ws/550e8400-e29b-41d4-a716-446655440000"),
            "/ws/:id"
        );
        assert_eq!(sanitize_path("/api/info"), "/api/info");
    }
}
