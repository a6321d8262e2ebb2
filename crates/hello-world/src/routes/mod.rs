//! HTTP routes for the responder.

use axum::{http::header, middleware, response::IntoResponse, routing::get, Router};
use common::middleware::http_metrics_middleware;
use common::observability::Observer;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

/// The greeting every `GET /hello-world` returns.
pub const GREETING: &str = "Hello World!";

/// Build the responder routes.
///
/// - `/hello-world` - the greeting, as plain text
/// - `/health` - always `Healthy`; there are no dependencies to check
/// - `/metrics` - Prometheus exposition, only when a handle is supplied
/// - HTTP metrics middleware when observability is enabled
pub fn build_routes(observer: &Observer, metrics: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        .route("/hello-world", get(hello_world))
        .route("/health", get(health));

    if let Some(handle) = metrics {
        app = app.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }

    if observer.is_enabled() {
        app = app.layer(middleware::from_fn(http_metrics_middleware));
    }

    app.layer(TraceLayer::new_for_http())
}

async fn hello_world() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], GREETING)
}

async fn health() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "Healthy")
}
