//! gRPC surface of the bridge.
//!
//! - [`HelloGrpcService`]: `HelloService/SayHello`
//! - [`GrpcMetricsLayer`]: per-call span and latency histogram

mod hello_service;
mod metrics_layer;

pub use hello_service::HelloGrpcService;
pub use metrics_layer::{GrpcMetricsLayer, GrpcMetricsService};

use common::hello_client::HelloWorldClient;
use common::observability::Observer;
use proto_gen::hello::hello_service_server::HelloServiceServer;
use std::sync::Arc;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tower::layer::util::{Identity, Stack};

/// Server router with the metrics layer applied.
pub type GrpcRouter = Router<Stack<GrpcMetricsLayer, Identity>>;

/// Build the gRPC router serving `HelloService`.
///
/// Callers choose how to serve it (`serve_with_shutdown` on an address in
/// production, `serve_with_incoming_shutdown` in tests).
pub fn grpc_router(client: Arc<HelloWorldClient>, observer: Observer) -> GrpcRouter {
    Server::builder()
        .layer(GrpcMetricsLayer::new(observer))
        .add_service(HelloServiceServer::new(HelloGrpcService::new(client)))
}
