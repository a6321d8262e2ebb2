//! Shared building blocks for the hello-world services.
//!
//! - [`hello_client`]: the pooled outbound client for the Hello World upstream
//! - [`config`]: upstream endpoint configuration and env parsing helpers
//! - [`observability`]: explicit telemetry context (logging + metrics)
//! - [`middleware`]: axum middleware shared by every HTTP surface
//! - [`shutdown`]: Ctrl+C / SIGTERM handling for the service binaries

pub mod config;
pub mod error;
pub mod hello_client;
pub mod middleware;
pub mod observability;
pub mod shutdown;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
