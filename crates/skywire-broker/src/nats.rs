//! NATS core transport.
//!
//! Frames are published on subjects named by [`Channel::name`]. NATS core
//! keeps no state, so there is no stored latest snapshot.

use bytes::Bytes;
use futures::StreamExt as _;
use futures::stream::{self, BoxStream};
use skywire_core::Channel;
use tracing::{debug, info};

use crate::BrokerMessage;
use crate::error::BrokerError;

/// Publishing handle to a NATS server.
#[derive(Clone)]
pub struct NatsBroker {
    client: async_nats::Client,
}

impl NatsBroker {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BrokerError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Publish `payload` on the subject for `channel` and flush.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Nats`] if the publish or flush fails.
    pub async fn publish(&self, channel: Channel, payload: Bytes) -> Result<(), BrokerError> {
        self.client
            .publish(channel.name(), payload)
            .await
            .map_err(|e| BrokerError::Nats(format!("failed to publish on {channel}: {e}")))?;
        self.client
            .flush()
            .await
            .map_err(|e| BrokerError::Nats(format!("failed to flush NATS: {e}")))?;
        debug!(channel = %channel, "frame published");
        Ok(())
    }

    /// Subscribe to the subjects for `channels`, merged into one stream.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Nats`] if any subscription fails.
    pub async fn subscribe(
        &self,
        channels: &[Channel],
    ) -> Result<BoxStream<'static, BrokerMessage>, BrokerError> {
        let mut subscriptions = Vec::with_capacity(channels.len());
        for &channel in channels {
            let subscriber = self
                .client
                .subscribe(channel.name())
                .await
                .map_err(|e| BrokerError::Nats(format!("failed to subscribe to {channel}: {e}")))?;
            subscriptions.push(
                subscriber
                    .map(move |message| BrokerMessage {
                        channel,
                        payload: message.payload,
                    })
                    .boxed(),
            );
        }
        info!(channels = ?channels, "subscribed to NATS subjects");
        Ok(stream::select_all(subscriptions).boxed())
    }
}
