//! Observability for the hello-world services.
//!
//! Nothing in this crate installs a global subscriber or recorder on its
//! own. `main` creates a [`Telemetry`] context once, hands its [`Observer`]
//! to the components that record metrics, and calls
//! [`Telemetry::shutdown`] on the way out.

pub mod metrics;
mod telemetry;

pub use telemetry::{
    LogFormat, Observer, Telemetry, TelemetryConfig, TelemetryDefaults, TelemetryError,
};
