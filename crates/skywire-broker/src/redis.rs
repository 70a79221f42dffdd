//! Redis (or Dragonfly) pub/sub transport.
//!
//! Frames are published on the channel names from [`Channel::name`]. The
//! snapshot payload is also stored under [`SNAPSHOT_KEY`] so consumers
//! that read the store directly can fetch the latest world without
//! subscribing.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `skywire:snapshot` | Bytes | Latest snapshot frame (JSON) |

use bytes::Bytes;
use fred::prelude::*;
use futures::StreamExt as _;
use futures::stream::{self, BoxStream};
use skywire_core::Channel;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::BrokerMessage;
use crate::error::BrokerError;

/// Key holding the latest snapshot payload.
pub const SNAPSHOT_KEY: &str = "skywire:snapshot";

/// Publishing handle to a Redis-compatible broker.
#[derive(Clone)]
pub struct RedisBroker {
    client: Client,
    url: String,
}

impl RedisBroker {
    /// Connect to the broker at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Config`] if the URL cannot be parsed.
    /// Returns [`BrokerError::Redis`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let config = Config::from_url(url)
            .map_err(|e| BrokerError::Config(format!("invalid Redis URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        info!("connected to Redis broker");
        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }

    /// Publish `payload` on `channel`.
    ///
    /// Snapshot payloads are stored under [`SNAPSHOT_KEY`] before they are
    /// published.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Redis`] if the write or publish fails.
    pub async fn publish(&self, channel: Channel, payload: Bytes) -> Result<(), BrokerError> {
        if channel == Channel::Snapshot {
            let _: () = self
                .client
                .set(SNAPSHOT_KEY, Value::Bytes(payload.clone()), None, None, false)
                .await?;
        }
        let receivers: i64 = self
            .client
            .publish(channel.name(), Value::Bytes(payload))
            .await?;
        debug!(channel = %channel, receivers, "frame published");
        Ok(())
    }

    /// The snapshot payload stored under [`SNAPSHOT_KEY`], if any.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Redis`] if the read fails.
    pub async fn latest_snapshot(&self) -> Result<Option<Bytes>, BrokerError> {
        let value: Option<Vec<u8>> = self.client.get(SNAPSHOT_KEY).await?;
        Ok(value.map(Bytes::from))
    }

    /// Subscribe to `channels` on a dedicated subscriber connection.
    ///
    /// The subscriber re-subscribes on reconnect. Messages on unknown
    /// channels or with non-binary payloads are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Redis`] if connecting or subscribing fails.
    pub async fn subscribe(
        &self,
        channels: &[Channel],
    ) -> Result<BoxStream<'static, BrokerMessage>, BrokerError> {
        let config = Config::from_url(&self.url)
            .map_err(|e| BrokerError::Config(format!("invalid Redis URL: {e}")))?;
        let subscriber = Builder::from_config(config).build_subscriber_client()?;
        subscriber.init().await?;
        let _resubscribe = subscriber.manage_subscriptions();

        let names: Vec<&'static str> = channels.iter().map(|channel| channel.name()).collect();
        let rx = subscriber.message_rx();
        subscriber.subscribe(names.clone()).await?;
        info!(channels = ?names, "subscribed to Redis channels");

        let messages = stream::unfold((subscriber, rx), |(subscriber, mut rx)| async move {
            loop {
                match rx.recv().await {
                    Ok(message) => {
                        let Some(channel) = Channel::from_name(&message.channel) else {
                            debug!(channel = %message.channel, "message on unknown channel ignored");
                            continue;
                        };
                        if let Some(payload) = message.value.into_bytes() {
                            return Some((BrokerMessage { channel, payload }, (subscriber, rx)));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Redis subscriber lagged, messages dropped");
                    }
                    Err(RecvError::Closed) => {
                        info!("Redis subscription closed");
                        return None;
                    }
                }
            }
        });
        Ok(messages.boxed())
    }
}
