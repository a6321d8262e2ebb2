//! Upstream health evaluation and the `/health` endpoint.
//!
//! Each probe calls the upstream once, on the same path the RPC uses, and
//! classifies the result:
//!
//! | Upstream outcome            | Probe status | Reported (HTTP)              |
//! |-----------------------------|--------------|------------------------------|
//! | body == `"Hello World!"`    | `Healthy`    | `Healthy` (200)              |
//! | any other body, even empty  | `Unhealthy`  | `Unhealthy` (503)            |
//! | transport failure           | `Error`      | configured [`FailureStatus`] |
//!
//! Nothing is cached between probes.
//!
//! # Probe client
//!
//! By default every probe builds its own [`HelloWorldClient`] and therefore
//! its own connection, so a probe never rides on a connection warmed up by
//! live traffic and measures the full connect path. [`ProbeClientPolicy::Shared`]
//! opts into reusing the request-path client instead.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use common::config::UpstreamConfig;
use common::error::TransportError;
use common::hello_client::HelloWorldClient;
use common::observability::Observer;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Body the upstream must return for the bridge to be healthy.
pub const CANONICAL_GREETING: &str = "Hello World!";

pub const HEALTHY_DESCRIPTION: &str = "A healthy result.";
pub const UNHEALTHY_DESCRIPTION: &str = "An unhealthy result.";

/// Classification of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// The upstream call itself failed.
    Error,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Error => "error",
        }
    }
}

/// Status reported to the orchestrator for a probe that ended in `Error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureStatus {
    #[default]
    Unhealthy,
    Degraded,
}

impl FailureStatus {
    /// Case-insensitive parse of `unhealthy` / `degraded`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unhealthy" => Some(FailureStatus::Unhealthy),
            "degraded" => Some(FailureStatus::Degraded),
            _ => None,
        }
    }
}

/// Which client a probe uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProbeClientPolicy {
    /// New client (and connection) per probe.
    #[default]
    Fresh,
    /// Reuse the pooled request-path client.
    Shared,
}

impl ProbeClientPolicy {
    /// Case-insensitive parse of `fresh` / `shared`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fresh" => Some(ProbeClientPolicy::Fresh),
            "shared" => Some(ProbeClientPolicy::Shared),
            _ => None,
        }
    }
}

/// Status in the hosting protocol's health-check vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ReportedStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportedStatus::Healthy => "Healthy",
            ReportedStatus::Degraded => "Degraded",
            ReportedStatus::Unhealthy => "Unhealthy",
        }
    }

    /// Degraded still serves traffic, so only Unhealthy fails the probe.
    pub fn http_status(self) -> StatusCode {
        match self {
            ReportedStatus::Healthy | ReportedStatus::Degraded => StatusCode::OK,
            ReportedStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub reported: ReportedStatus,
    pub description: &'static str,
    /// Failure detail for `Error` probes.
    pub error: Option<String>,
}

enum ProbeClient {
    Fresh(UpstreamConfig),
    Shared(Arc<HelloWorldClient>),
}

/// Runs health probes against the upstream.
pub struct HealthEvaluator {
    client: ProbeClient,
    failure_status: FailureStatus,
    observer: Observer,
}

impl HealthEvaluator {
    /// Evaluator that builds a new client for every probe.
    pub fn fresh_per_probe(
        config: UpstreamConfig,
        failure_status: FailureStatus,
        observer: Observer,
    ) -> Self {
        Self {
            client: ProbeClient::Fresh(config),
            failure_status,
            observer,
        }
    }

    /// Evaluator that reuses an existing client.
    pub fn shared(
        client: Arc<HelloWorldClient>,
        failure_status: FailureStatus,
        observer: Observer,
    ) -> Self {
        Self {
            client: ProbeClient::Shared(client),
            failure_status,
            observer,
        }
    }

    /// Run one probe. Never fails; upstream errors become `Error` reports.
    #[instrument(skip_all, name = "hello.health.probe")]
    pub async fn check(&self) -> HealthReport {
        // Upstream metrics for these calls land under `operation="health_check"`.
        let outcome = match &self.client {
            ProbeClient::Fresh(config) => {
                match HelloWorldClient::new(config.clone(), self.observer.clone()) {
                    Ok(client) => client.get_hello_world_for_health().await,
                    Err(e) => Err(e),
                }
            }
            ProbeClient::Shared(client) => client.get_hello_world_for_health().await,
        };

        let report = self.classify(outcome);

        self.observer.record_health_probe(report.status.as_str());
        match &report.error {
            Some(error) => warn!(
                target: "hello.observability.health",
                status = report.status.as_str(),
                reported = report.reported.as_str(),
                error = %error,
                "Health probe failed"
            ),
            None => debug!(
                target: "hello.observability.health",
                status = report.status.as_str(),
                "Health probe completed"
            ),
        }

        report
    }

    /// Map an upstream outcome to a report.
    pub fn classify(&self, outcome: Result<String, TransportError>) -> HealthReport {
        match outcome {
            Ok(body) if body == CANONICAL_GREETING => HealthReport {
                status: HealthStatus::Healthy,
                reported: ReportedStatus::Healthy,
                description: HEALTHY_DESCRIPTION,
                error: None,
            },
            Ok(_) => HealthReport {
                status: HealthStatus::Unhealthy,
                reported: ReportedStatus::Unhealthy,
                description: UNHEALTHY_DESCRIPTION,
                error: None,
            },
            Err(e) => HealthReport {
                status: HealthStatus::Error,
                reported: match self.failure_status {
                    FailureStatus::Unhealthy => ReportedStatus::Unhealthy,
                    FailureStatus::Degraded => ReportedStatus::Degraded,
                },
                description: UNHEALTHY_DESCRIPTION,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Create the health router.
///
/// # Endpoints
///
/// - `GET /health` - runs one probe; 200 for Healthy/Degraded, 503 for Unhealthy.
///   The body is the reported status as plain text; failure detail is only logged.
pub fn health_router(evaluator: Arc<HealthEvaluator>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(evaluator)
}

async fn health_handler(State(evaluator): State<Arc<HealthEvaluator>>) -> impl IntoResponse {
    let report = evaluator.check().await;
    (
        report.reported.http_status(),
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        report.reported.as_str(),
    )
}
