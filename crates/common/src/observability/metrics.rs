//! Metrics definitions shared by the hello-world services.
//!
//! All metrics follow Prometheus naming conventions:
//! - `hello_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 3 values (success, error, timeout)
//! - `endpoint`: the known routes plus `/other`
//! - `operation`, `service`, `method`: bounded by code
//!
//! Every `hello_*` histogram shares one fixed set of bucket boundaries so
//! inbound and outbound latencies can be compared bucket for bucket.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::time::Duration;

/// Histogram bucket boundaries in seconds (0 ms to 10 s).
pub const REQUEST_DURATION_BUCKETS: &[f64] = &[
    0.0, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Prometheus builder with the fixed bucket layout applied to every
/// `hello_` histogram.
///
/// Installing the recorder is left to the caller so tests can build a
/// local recorder from the same configuration.
///
/// # Errors
///
/// Returns error if the bucket configuration is rejected.
pub fn prometheus_builder() -> Result<PrometheusBuilder, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("hello_".to_string()),
            REQUEST_DURATION_BUCKETS,
        )
        .map_err(|e| format!("Failed to set request duration buckets: {e}"))
}

// ============================================================================
// Upstream (Outbound Client) Metrics
// ============================================================================

/// Record one call to the upstream Hello World service.
///
/// Metric: `hello_upstream_request_duration_seconds`, `hello_upstream_requests_total`
/// Labels: `operation` (hello_world, health_check), `status`
pub fn record_upstream_request(operation: &str, status: &str, duration: Duration) {
    histogram!("hello_upstream_request_duration_seconds",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("hello_upstream_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record retirement of an upstream connection pool generation.
///
/// Metric: `hello_upstream_pool_rotations_total`
pub fn record_pool_rotation() {
    counter!("hello_upstream_pool_rotations_total").increment(1);
}

// ============================================================================
// gRPC Metrics
// ============================================================================

/// Record completion of an inbound gRPC call.
///
/// Metric: `hello_grpc_request_duration_seconds`, `hello_grpc_requests_total`
/// Labels: `service`, `method`, `status` (histogram) / `code` (counter)
pub fn record_grpc_request(service: &str, method: &str, grpc_code: i32, duration: Duration) {
    let status = categorize_grpc_code(grpc_code);

    histogram!("hello_grpc_request_duration_seconds",
        "service" => service.to_string(),
        "method" => method.to_string(),
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("hello_grpc_requests_total",
        "service" => service.to_string(),
        "method" => method.to_string(),
        "code" => grpc_code.to_string()
    )
    .increment(1);
}

/// Categorize a gRPC status code into success/error/timeout.
///
/// `CANCELLED` (1) counts as a timeout because tonic reports an expired
/// `grpc-timeout` that way.
fn categorize_grpc_code(code: i32) -> &'static str {
    match code {
        0 => "success",
        1 | 4 => "timeout",
        _ => "error",
    }
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `hello_http_requests_total`, `hello_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("hello_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("hello_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/hello-world" => "/hello-world",
        "/hello-json-world" => "/hello-json-world",
        _ => "/other",
    }
}

// ============================================================================
// Health Metrics
// ============================================================================

/// Record the outcome of one health probe.
///
/// Metric: `hello_health_probes_total`
/// Labels: `status` (healthy, unhealthy, error)
pub fn record_health_probe(status: &str) {
    counter!("hello_health_probes_total", "status" => status.to_string()).increment(1);
}
