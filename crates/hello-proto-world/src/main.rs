//! Hello World proto bridge
//!
//! gRPC front for the Hello World HTTP service.
//!
//! # Servers
//!
//! - gRPC server for `HelloService/SayHello` (default: 0.0.0.0:50051)
//! - HTTP server for `/health` and `/metrics` (default: 0.0.0.0:8081)
//!
//! # Startup Flow
//!
//! 1. Initialize telemetry (logging + Prometheus recorder, unless disabled)
//! 2. Load configuration from environment
//! 3. Build the pooled upstream client and the health evaluator
//! 4. Start health HTTP server
//! 5. Start gRPC server
//! 6. Wait for shutdown signal, then drain and flush telemetry

#![warn(clippy::pedantic)]

use common::observability::{Telemetry, TelemetryConfig};
use common::shutdown::shutdown_signal;
use hello_proto_world::config::{Config, TELEMETRY_DEFAULTS};
use hello_proto_world::errors::BridgeError;
use hello_proto_world::grpc::grpc_router;
use hello_proto_world::routes::{build_routes, AppState};
use hello_proto_world::supervisor::supervise;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let telemetry_config = match TelemetryConfig::from_env(TELEMETRY_DEFAULTS) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load telemetry configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let telemetry = match Telemetry::init(telemetry_config) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&telemetry).await;
    if let Err(e) = &outcome {
        error!(error = %e, "Hello World proto bridge failed");
    }

    telemetry.shutdown();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn run(telemetry: &Telemetry) -> Result<(), BridgeError> {
    info!(service = telemetry.service_name(), "Starting Hello World proto bridge");

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        upstream = %config.upstream.base_url,
        pooled_connection_lifetime_seconds = config.upstream.pooled_connection_lifetime.as_secs(),
        grpc_bind_address = %config.grpc_bind_address,
        health_bind_address = %config.health_bind_address,
        health_failure_status = ?config.health_failure_status,
        health_probe_client = ?config.health_probe_client,
        "Configuration loaded successfully"
    );

    let state = AppState::new(&config, telemetry.observer(), telemetry.metrics_handle())?;
    let shutdown_token = CancellationToken::new();

    // Parse and bind BEFORE spawning to fail fast on address errors
    let health_addr = parse_addr(&config.health_bind_address)?;
    let grpc_addr = parse_addr(&config.grpc_bind_address)?;
    let listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .map_err(|e| BridgeError::Bind {
            addr: health_addr.to_string(),
            reason: e.to_string(),
        })?;
    info!(addr = %health_addr, "Health server bound successfully");

    let app = build_routes(&state);
    let health_shutdown_token = shutdown_token.child_token();
    let health_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                health_shutdown_token.cancelled().await;
                info!("Health server shutting down");
            })
            .await
    });

    let grpc_shutdown_token = shutdown_token.child_token();
    let grpc_server = grpc_router(Arc::clone(&state.client), state.observer.clone())
        .serve_with_shutdown(grpc_addr, async move {
            grpc_shutdown_token.cancelled().await;
            info!("gRPC server shutting down");
        });
    let grpc_task = tokio::spawn(grpc_server);
    info!(addr = %grpc_addr, "gRPC server started");

    info!("Hello World proto bridge running - press Ctrl+C to shutdown");

    supervise(
        shutdown_signal(),
        &shutdown_token,
        grpc_task,
        health_task,
        config.shutdown_drain,
    )
    .await?;

    info!("Hello World proto bridge shutdown complete");
    Ok(())
}

fn parse_addr(addr: &str) -> Result<SocketAddr, BridgeError> {
    addr.parse().map_err(|e| {
        error!(error = %e, addr = %addr, "Invalid bind address");
        BridgeError::Bind {
            addr: addr.to_string(),
            reason: format!("invalid address: {e}"),
        }
    })
}
