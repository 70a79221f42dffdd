//! Ingestion binary for Skywire.
//!
//! Polls the world feed on a fixed interval, derives the world, and
//! publishes a delta frame and a snapshot frame to the broker after every
//! accepted feed update.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `skywire-config.yaml` (or `SKYWIRE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the HTTP feed client
//! 4. Connect to the configured broker
//! 5. Run the ingestion loop until `Ctrl-C`

mod error;
mod http_feed;

use std::path::PathBuf;
use std::sync::Arc;

use skywire_broker::Broker;
use skywire_core::{IngestLoop, IngestSettings, SkywireConfig};
use tracing::{info, warn};

use crate::error::IngestAppError;
use crate::http_feed::HttpFeed;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "skywire-config.yaml";

/// Application entry point for the ingestion process.
///
/// # Errors
///
/// Returns an error if configuration, the feed client, or the broker
/// connection cannot be set up.
#[tokio::main]
async fn main() -> Result<(), IngestAppError> {
    // 1. Load configuration.
    let config_path = std::env::var("SKYWIRE_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = SkywireConfig::load_or_default(&config_path)?;

    // 2. Initialize structured logging.
    skywire_core::logging::init(&config.logging);
    info!(
        config = %config_path.display(),
        data_url = %config.feed.data_url,
        poll_interval_secs = config.feed.poll_interval_secs,
        precision = ?config.encoding.precision,
        "skywire-ingest starting"
    );

    // 3. Build the feed client.
    let feed = HttpFeed::new(&config.feed)?;

    // 4. Connect to the broker.
    let broker = Broker::connect(&config.infrastructure).await?;
    info!(broker = ?broker.kind(), "broker connected");

    // 5. Run until interrupted.
    let ingest = Arc::new(IngestLoop::new(
        feed,
        broker,
        IngestSettings::from_config(&config),
    ));
    ingest
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C, shutting down");
            }
        })
        .await;

    info!("skywire-ingest shutdown complete");
    Ok(())
}
