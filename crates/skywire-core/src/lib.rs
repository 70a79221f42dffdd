//! Ingestion loop, world derivation, and configuration for Skywire.
//!
//! This crate owns the poll, derive, diff, and publish cycle that turns a
//! polled world feed into snapshot and delta frames.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `skywire-config.yaml` into
//!   strongly-typed structs, with environment overrides.
//! - [`logging`] -- `tracing` subscriber setup for the binaries.
//! - [`projection`] -- Web-Mercator projection of feed coordinates.
//! - [`derive`] -- Derivation of the world state from feed documents.
//! - [`diff`] -- Collection diffing and [`WsDelta`] assembly.
//! - [`feed`] -- [`FeedSource`] trait for fetching feed documents.
//! - [`publish`] -- [`Publisher`] trait and broker [`Channel`]s.
//! - [`ingest`] -- The guarded ingestion loop.
//!
//! [`WsDelta`]: skywire_types::WsDelta
//! [`FeedSource`]: feed::FeedSource
//! [`Publisher`]: publish::Publisher
//! [`Channel`]: publish::Channel

pub mod config;
pub mod derive;
pub mod diff;
pub mod feed;
pub mod ingest;
pub mod logging;
pub mod projection;
pub mod publish;

pub use config::{ConfigError, SkywireConfig};
pub use feed::{FeedError, FeedSource};
pub use ingest::{CycleOutcome, CycleSummary, IngestError, IngestLoop, IngestSettings};
pub use publish::{Channel, PublishError, Publisher};
