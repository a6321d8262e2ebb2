//! Observability for the bridge.
//!
//! - `GET /health` runs the [`HealthEvaluator`] against the upstream.
//! - `GET /metrics` is served from the Prometheus handle owned by
//!   `common::observability::Telemetry` (see [`crate::routes`]).

pub mod health;

pub use health::{
    health_router, FailureStatus, HealthEvaluator, HealthReport, HealthStatus, ProbeClientPolicy,
    ReportedStatus,
};
