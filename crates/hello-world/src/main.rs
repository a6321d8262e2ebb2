//! Hello World responder
//!
//! Plain-text upstream for the proto bridge and the JSON responder.

use common::observability::{Telemetry, TelemetryConfig};
use common::shutdown::shutdown_signal;
use hello_world::config::{Config, TELEMETRY_DEFAULTS};
use hello_world::routes::build_routes;
use std::net::SocketAddr;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let telemetry = Telemetry::init(TelemetryConfig::from_env(TELEMETRY_DEFAULTS)?)?;

    let result = serve(&telemetry).await;
    if let Err(e) = &result {
        error!("Hello World responder failed: {}", e);
    }

    telemetry.shutdown();
    result
}

async fn serve(telemetry: &Telemetry) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Hello World responder");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let app = build_routes(&telemetry.observer(), telemetry.metrics_handle());

    info!("Hello World responder listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Hello World responder shutdown complete");

    Ok(())
}
