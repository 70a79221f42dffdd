//! Broker publish layer for Skywire.
//!
//! Carries snapshot and delta frames from the ingestion process to any
//! number of fan-out servers over Redis/Dragonfly pub/sub or NATS core
//! subjects. Delivery is at-most-once.
//!
//! # Modules
//!
//! - [`broker`] -- The [`Broker`] handle and [`BrokerMessage`]
//! - [`redis`] -- Redis/Dragonfly transport via `fred`
//! - [`nats`] -- NATS transport via `async-nats`
//! - [`error`] -- Error types

pub mod broker;
pub mod error;
pub mod nats;
pub mod redis;

pub use broker::{Broker, BrokerMessage};
pub use error::BrokerError;
pub use nats::NatsBroker;
pub use redis::{RedisBroker, SNAPSHOT_KEY};
