//! Backend-agnostic broker handle.

use bytes::Bytes;
use futures::stream::BoxStream;
use skywire_core::config::{BrokerKind, InfrastructureConfig};
use skywire_core::{Channel, PublishError, Publisher};

use crate::error::BrokerError;
use crate::nats::NatsBroker;
use crate::redis::RedisBroker;

/// A frame received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Channel the frame arrived on.
    pub channel: Channel,
    /// Raw JSON payload.
    pub payload: Bytes,
}

/// A connected broker of either supported kind.
#[derive(Clone)]
pub enum Broker {
    /// Redis or Dragonfly.
    Redis(RedisBroker),
    /// NATS core.
    Nats(NatsBroker),
}

impl Broker {
    /// Connect to the broker selected by `config.broker`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the URL is invalid or the connection fails.
    pub async fn connect(config: &InfrastructureConfig) -> Result<Self, BrokerError> {
        match config.broker {
            BrokerKind::Redis => Ok(Self::Redis(RedisBroker::connect(&config.redis_url).await?)),
            BrokerKind::Nats => Ok(Self::Nats(NatsBroker::connect(&config.nats_url).await?)),
        }
    }

    /// Which kind of broker this is.
    pub const fn kind(&self) -> BrokerKind {
        match self {
            Self::Redis(_) => BrokerKind::Redis,
            Self::Nats(_) => BrokerKind::Nats,
        }
    }

    /// Publish `payload` on `channel`.
    ///
    /// Completes once the broker has accepted the payload; there is no
    /// acknowledgement from subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the hand-off fails.
    pub async fn publish_frame(&self, channel: Channel, payload: Bytes) -> Result<(), BrokerError> {
        match self {
            Self::Redis(broker) => broker.publish(channel, payload).await,
            Self::Nats(broker) => broker.publish(channel, payload).await,
        }
    }

    /// Subscribe to `channels`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the subscription cannot be set up.
    pub async fn subscribe(
        &self,
        channels: &[Channel],
    ) -> Result<BoxStream<'static, BrokerMessage>, BrokerError> {
        match self {
            Self::Redis(broker) => broker.subscribe(channels).await,
            Self::Nats(broker) => broker.subscribe(channels).await,
        }
    }

    /// The latest stored snapshot payload. Always `None` on NATS.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the store read fails.
    pub async fn latest_snapshot(&self) -> Result<Option<Bytes>, BrokerError> {
        match self {
            Self::Redis(broker) => broker.latest_snapshot().await,
            Self::Nats(_) => Ok(None),
        }
    }
}

impl Publisher for Broker {
    async fn publish(&self, channel: Channel, payload: Bytes) -> Result<(), PublishError> {
        self.publish_frame(channel, payload)
            .await
            .map_err(|source| PublishError::Broker {
                channel,
                source: Box::new(source),
            })
    }
}
