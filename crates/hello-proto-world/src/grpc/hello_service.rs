//! `HelloService` implementation.
//!
//! Each `SayHello` call performs exactly one upstream `GET /hello-world`
//! through the shared client and returns the body untouched. Upstream
//! failures surface as gRPC errors; there is no retry and no fallback reply.

use crate::errors::BridgeError;
use common::hello_client::HelloWorldClient;
use proto_gen::hello::hello_service_server::HelloService;
use proto_gen::hello::HelloReply;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::instrument;

/// gRPC front of the upstream Hello World service.
#[derive(Clone)]
pub struct HelloGrpcService {
    client: Arc<HelloWorldClient>,
}

impl HelloGrpcService {
    pub fn new(client: Arc<HelloWorldClient>) -> Self {
        Self { client }
    }
}

#[tonic::async_trait]
impl HelloService for HelloGrpcService {
    /// Dropping this future (client cancel, expired `grpc-timeout`) drops
    /// the in-flight upstream request with it.
    #[instrument(skip_all, name = "hello.grpc.say_hello")]
    async fn say_hello(&self, _request: Request<()>) -> Result<Response<HelloReply>, Status> {
        let result = self
            .client
            .get_hello_world()
            .await
            .map_err(BridgeError::from)?;

        Ok(Response::new(HelloReply { result }))
    }
}
