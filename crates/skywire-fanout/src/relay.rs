//! Broker-to-socket relay.
//!
//! Every broker frame is gzip-compressed once. Delta frames are broadcast
//! to all connected sockets; snapshot frames only replace the cached
//! snapshot served over HTTP.

use std::sync::Arc;

use futures::{Stream, StreamExt as _};
use skywire_broker::BrokerMessage;
use skywire_core::Channel;
use tracing::{debug, info, warn};

use crate::compress::gzip;
use crate::error::FanoutError;
use crate::state::AppState;

/// Relay one broker frame.
///
/// # Errors
///
/// Returns [`FanoutError::Compression`] if the frame cannot be compressed.
pub async fn relay_message(state: &AppState, message: &BrokerMessage) -> Result<(), FanoutError> {
    let frame = gzip(&message.payload)?;
    match message.channel {
        Channel::Delta => {
            let report = state.registry.broadcast(&frame).await;
            state.record_delta();
            debug!(
                raw_bytes = message.payload.len(),
                gzip_bytes = frame.len(),
                delivered = report.delivered,
                dropped = report.dropped,
                "delta frame broadcast"
            );
        }
        Channel::Snapshot => {
            debug!(
                raw_bytes = message.payload.len(),
                gzip_bytes = frame.len(),
                "snapshot cached"
            );
            state.set_snapshot(frame).await;
        }
    }
    Ok(())
}

/// Relay frames from `messages` until the stream ends.
pub async fn run_relay<S>(state: Arc<AppState>, mut messages: S)
where
    S: Stream<Item = BrokerMessage> + Unpin,
{
    info!("relay started");
    while let Some(message) = messages.next().await {
        if let Err(e) = relay_message(&state, &message).await {
            warn!(channel = %message.channel, error = %e, "failed to relay frame");
        }
    }
    info!("broker stream ended, relay stopped");
}
