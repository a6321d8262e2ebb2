//! Test server harness for E2E testing
//!
//! Provides `TestBridgeServer` for spawning a real proto bridge in tests.

use common::observability::Observer;
use hello_proto_world::config::Config;
use hello_proto_world::grpc::grpc_router;
use hello_proto_world::routes::{build_routes, AppState};
use proto_gen::hello::hello_service_client::HelloServiceClient;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Channel;

/// Test harness running the bridge's gRPC and health servers.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_say_hello_e2e() -> Result<()> {
///     let upstream = MockUpstream::hello_world().await?;
///     let server = TestBridgeServer::spawn(&upstream.base_url()).await?;
///
///     let reply = server.client().await?.say_hello(()).await?;
///     assert_eq!(reply.into_inner().result, "Hello World!");
///     Ok(())
/// }
/// ```
pub struct TestBridgeServer {
    grpc_addr: SocketAddr,
    health_addr: SocketAddr,
    config: Config,
    grpc_shutdown: Option<oneshot::Sender<()>>,
    grpc_handle: JoinHandle<()>,
    health_handle: JoinHandle<()>,
}

impl TestBridgeServer {
    /// Spawn a bridge pointed at `upstream_base_url` with default settings.
    pub async fn spawn(upstream_base_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(upstream_base_url, HashMap::new()).await
    }

    /// Spawn a bridge with extra configuration variables.
    ///
    /// Bind addresses in `vars` are ignored; both servers bind to
    /// `127.0.0.1:0`. Observability stays off so tests do not fight over the
    /// global metrics recorder.
    pub async fn spawn_with_vars(
        upstream_base_url: &str,
        mut vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        vars.insert(
            "HELLO_WORLD_BASE_URL".to_string(),
            upstream_base_url.to_string(),
        );

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = AppState::new(&config, Observer::disabled(), None)
            .map_err(|e| anyhow::anyhow!("Failed to build app state: {}", e))?;

        let health_listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind health server: {}", e))?;
        let health_addr = health_listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get health address: {}", e))?;

        let app = build_routes(&state);
        let health_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(health_listener, app).await {
                eprintln!("Test health server error: {}", e);
            }
        });

        let grpc_listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind gRPC server: {}", e))?;
        let grpc_addr = grpc_listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get gRPC address: {}", e))?;

        let (grpc_shutdown, shutdown_rx) = oneshot::channel::<()>();
        let router = grpc_router(Arc::clone(&state.client), state.observer.clone());
        let grpc_handle = tokio::spawn(async move {
            let incoming = TcpListenerStream::new(grpc_listener);
            let signal = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = router.serve_with_incoming_shutdown(incoming, signal).await {
                eprintln!("Test gRPC server error: {}", e);
            }
        });

        Ok(Self {
            grpc_addr,
            health_addr,
            config,
            grpc_shutdown: Some(grpc_shutdown),
            grpc_handle,
            health_handle,
        })
    }

    /// gRPC endpoint URL, e.g. `http://127.0.0.1:50123`.
    pub fn grpc_url(&self) -> String {
        format!("http://{}", self.grpc_addr)
    }

    /// Health endpoint URL, e.g. `http://127.0.0.1:50124/health`.
    pub fn health_url(&self) -> String {
        format!("http://{}/health", self.health_addr)
    }

    pub fn grpc_addr(&self) -> SocketAddr {
        self.grpc_addr
    }

    pub fn health_addr(&self) -> SocketAddr {
        self.health_addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connect a new gRPC client to the bridge.
    pub async fn client(&self) -> Result<HelloServiceClient<Channel>, anyhow::Error> {
        HelloServiceClient::connect(self.grpc_url())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect gRPC client: {}", e))
    }

    /// Fetch `/health`, returning the status code and body.
    pub async fn health(&self) -> Result<(u16, String), anyhow::Error> {
        let response = reqwest::get(self.health_url()).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}

impl Drop for TestBridgeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.grpc_shutdown.take() {
            let _ = tx.send(());
        }
        self.grpc_handle.abort();
        self.health_handle.abort();
    }
}
