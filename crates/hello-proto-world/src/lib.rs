//! Hello World gRPC bridge.
//!
//! Answers the unary `HelloService/SayHello` RPC by calling `GET /hello-world`
//! on a single configured upstream and returning its body verbatim as
//! `HelloReply.result`.
//!
//! # Architecture
//!
//! ```text
//! gRPC client ──► GrpcMetricsLayer ──► HelloGrpcService ──► HelloWorldClient ──► upstream
//!                                                                ▲
//! orchestrator ──► GET /health ──► HealthEvaluator ──────────────┘ (fresh or shared)
//! ```
//!
//! # Modules
//!
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types and their gRPC status mapping
//! - [`grpc`] - `HelloService` implementation and metrics layer
//! - [`observability`] - Health evaluation and the `/health` endpoint
//! - [`routes`] - Health/metrics HTTP router and shared state
//! - [`supervisor`] - Server supervision and bounded shutdown drain

pub mod config;
pub mod errors;
pub mod grpc;
pub mod observability;
pub mod routes;
pub mod supervisor;
