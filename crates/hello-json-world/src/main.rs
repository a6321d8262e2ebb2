//! Hello JSON World
//!
//! JSON front for the Hello World service.

use common::observability::{Telemetry, TelemetryConfig};
use common::shutdown::shutdown_signal;
use hello_json_world::config::{Config, TELEMETRY_DEFAULTS};
use hello_json_world::routes::{build_routes, AppState};
use std::net::SocketAddr;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let telemetry = Telemetry::init(TelemetryConfig::from_env(TELEMETRY_DEFAULTS)?)?;

    let result = serve(&telemetry).await;
    if let Err(e) = &result {
        error!("Hello JSON World failed: {}", e);
    }

    telemetry.shutdown();
    result
}

async fn serve(telemetry: &Telemetry) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Hello JSON World");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        upstream = %config.upstream.base_url,
        bind_address = %config.bind_address,
        "Configuration loaded successfully"
    );

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let observer = telemetry.observer();
    let state = AppState::new(&config, observer.clone())?;
    let app = build_routes(state, &observer, telemetry.metrics_handle());

    info!("Hello JSON World listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Hello JSON World shutdown complete");

    Ok(())
}
