//! HTTP routes for the bridge's health and metrics server.
//!
//! Defines the Axum router and the application state shared with the gRPC
//! server.

use crate::config::Config;
use crate::errors::BridgeError;
use crate::observability::{health_router, HealthEvaluator, ProbeClientPolicy};
use axum::{middleware, routing::get, Router};
use common::hello_client::HelloWorldClient;
use common::middleware::http_metrics_middleware;
use common::observability::Observer;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Components shared by the gRPC and HTTP servers.
#[derive(Clone)]
pub struct AppState {
    /// Pooled request-path client; one per process.
    pub client: Arc<HelloWorldClient>,

    /// Health evaluator behind `/health`.
    pub health: Arc<HealthEvaluator>,

    /// Metrics handle for request-path components.
    pub observer: Observer,

    /// Prometheus handle behind `/metrics`; `None` when observability is off.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the shared client and the health evaluator from configuration.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Upstream` if the HTTP client cannot be built.
    pub fn new(
        config: &Config,
        observer: Observer,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, BridgeError> {
        let client = Arc::new(HelloWorldClient::new(
            config.upstream.clone(),
            observer.clone(),
        )?);

        let health = match config.health_probe_client {
            ProbeClientPolicy::Fresh => HealthEvaluator::fresh_per_probe(
                config.upstream.clone(),
                config.health_failure_status,
                observer.clone(),
            ),
            ProbeClientPolicy::Shared => HealthEvaluator::shared(
                Arc::clone(&client),
                config.health_failure_status,
                observer.clone(),
            ),
        };

        Ok(Self {
            client,
            health: Arc::new(health),
            observer,
            metrics,
        })
    }
}

/// Build the health/metrics routes.
///
/// - `/health` - upstream health probe
/// - `/metrics` - Prometheus exposition, only when observability is enabled
/// - HTTP metrics middleware when observability is enabled
/// - TraceLayer for request logging
pub fn build_routes(state: &AppState) -> Router {
    let mut app = health_router(Arc::clone(&state.health));

    if let Some(handle) = state.metrics.clone() {
        app = app.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }

    if state.observer.is_enabled() {
        app = app.layer(middleware::from_fn(http_metrics_middleware));
    }

    app.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::collections::HashMap;
    use tower::util::ServiceExt;

    fn test_config() -> Config {
        Config::from_vars(&HashMap::from([(
            "HELLO_WORLD_BASE_URL".to_string(),
            "http://127.0.0.1:9".to_string(),
        )]))
        .unwrap()
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_metrics_route_absent_when_disabled() {
        let state = AppState::new(&test_config(), Observer::disabled(), None).unwrap();
        let app = build_routes(&state);

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_route_renders_when_enabled() {
        let recorder = common::observability::metrics::prometheus_builder()
            .unwrap()
            .build_recorder();
        let handle = recorder.handle();

        let state = AppState::new(&test_config(), Observer::enabled(), Some(handle)).unwrap();
        let app = build_routes(&state);

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_shared_policy_reuses_request_client() {
        let mut config = test_config();
        config.health_probe_client = ProbeClientPolicy::Shared;

        let state = AppState::new(&config, Observer::disabled(), None).unwrap();

        assert_eq!(Arc::strong_count(&state.client), 2);
    }
}
