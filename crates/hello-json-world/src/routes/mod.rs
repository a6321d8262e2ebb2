//! HTTP routes for the JSON responder.

use crate::config::Config;
use crate::errors::JsonWorldError;
use axum::{extract::State, middleware, routing::get, Json, Router};
use common::error::TransportError;
use common::hello_client::HelloWorldClient;
use common::middleware::http_metrics_middleware;
use common::observability::Observer;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::instrument;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The one pooled upstream client for the process.
    pub client: Arc<HelloWorldClient>,
}

impl AppState {
    pub fn new(config: &Config, observer: Observer) -> Result<Self, TransportError> {
        Ok(Self {
            client: Arc::new(HelloWorldClient::new(config.upstream.clone(), observer)?),
        })
    }
}

/// Response body of `GET /hello-json-world`.
#[derive(Debug, Serialize)]
pub struct HelloJsonResponse {
    pub result: String,
}

/// Build the JSON responder routes.
///
/// - `/hello-json-world` - upstream greeting wrapped in JSON
/// - `/metrics` - Prometheus exposition, only when a handle is supplied
pub fn build_routes(
    state: AppState,
    observer: &Observer,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let mut app = Router::new()
        .route("/hello-json-world", get(hello_json_world))
        .with_state(state);

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

#[instrument(skip_all, name = "hello.json.hello_json_world")]
async fn hello_json_world(
    State(state): State<AppState>,
) -> Result<Json<HelloJsonResponse>, JsonWorldError> {
    let result = state.client.get_hello_world().await?;
    Ok(Json(HelloJsonResponse { result }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use common::testing::{unreachable_base_url, MockUpstream};
    use http_body_util::BodyExt;
    use std::collections::HashMap;
    use tower::util::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_for(base_url: &str) -> Router {
        let config = Config::from_vars(&HashMap::from([(
            "HELLO_WORLD_BASE_URL".to_string(),
            base_url.to_string(),
        )]))
        .unwrap();
        let state = AppState::new(&config, Observer::disabled()).unwrap();
        build_routes(state, &Observer::disabled(), None)
    }

    async fn get_json(app: Router) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .uri("/hello-json-world")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_wraps_greeting_in_result() {
        let upstream = MockUpstream::hello_world().await.unwrap();

        let (status, body) = get_json(app_for(&upstream.base_url())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "result": "Hello World!" }));
    }

    #[tokio::test]
    async fn test_body_is_relayed_verbatim() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello-world"))
            .respond_with(ResponseTemplate::new(200).set_body_string(" Goodbye \"quoted\"\n"))
            .mount(&mock_server)
            .await;

        let (_, body) = get_json(app_for(&mock_server.uri())).await;

        assert_eq!(body["result"], " Goodbye \"quoted\"\n");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_503() {
        let (status, body) = get_json(app_for(&unreachable_base_url().unwrap())).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    }
}
