//! Fan-out server binary for Skywire.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `skywire-config.yaml` (or `SKYWIRE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to the broker and prime the snapshot cache from it
//! 4. Subscribe to the snapshot and delta channels and start the relay
//! 5. Serve HTTP and `WebSocket` clients until `Ctrl-C`

use std::path::PathBuf;
use std::sync::Arc;

use skywire_broker::Broker;
use skywire_core::{Channel, SkywireConfig};
use skywire_fanout::compress::gzip;
use skywire_fanout::{AppState, run_relay, start_server};
use tracing::{info, warn};

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "skywire-config.yaml";

/// Application entry point for the fan-out server.
///
/// # Errors
///
/// Returns an error if configuration, the broker, or the listener cannot
/// be set up.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::var("SKYWIRE_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = SkywireConfig::load_or_default(&config_path)?;

    // 2. Initialize structured logging.
    skywire_core::logging::init(&config.logging);
    info!(
        config = %config_path.display(),
        port = config.infrastructure.fanout_port,
        socket_buffer = config.infrastructure.socket_buffer,
        "skywire-fanout starting"
    );

    // 3. Connect to the broker.
    let state = Arc::new(AppState::new(config.infrastructure.socket_buffer));
    let broker = Broker::connect(&config.infrastructure).await?;
    info!(broker = ?broker.kind(), "broker connected");

    match broker.latest_snapshot().await {
        Ok(Some(payload)) => {
            state.set_snapshot(gzip(&payload)?).await;
            info!(bytes = payload.len(), "snapshot cache primed from broker");
        }
        Ok(None) => info!("no stored snapshot, waiting for the next cycle"),
        Err(e) => warn!(error = %e, "failed to read stored snapshot"),
    }

    // 4. Start the relay.
    let messages = broker.subscribe(&Channel::ALL).await?;
    let relay = tokio::spawn(run_relay(Arc::clone(&state), messages));

    // 5. Serve until interrupted.
    start_server(config.infrastructure.fanout_port, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C, shutting down");
        }
    })
    .await?;

    relay.abort();
    info!("skywire-fanout shutdown complete");
    Ok(())
}
