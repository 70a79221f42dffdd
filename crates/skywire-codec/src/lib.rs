//! Binary telemetry codec for Skywire.
//!
//! Every moving entity (an aircraft track) is described by a [`TrackPoint`].
//! This crate turns those observations into the smallest correct wire
//! records and back:
//!
//! - [`track`] -- the fixed 25-byte full record
//! - [`delta`] -- field masks and variable-length partial records
//! - [`record`] -- the [`TrackRecord`] full/delta union and its JSON embedding
//! - [`suppression`] -- skipping unchanged steady entities
//! - [`encoder`] -- the per-entity [`DeltaEncoder`] and its last-sent cache
//! - [`error`] -- [`CodecError`]
//!
//! # Stream contract
//!
//! The first record of every entity stream is full. Later records are deltas
//! against the last record actually sent, never against a lossy prior delta.

pub mod delta;
pub mod encoder;
pub mod error;
pub mod record;
pub mod suppression;
pub mod track;

// Re-export primary types for convenience.
pub use delta::{FieldMask, Precision, TrackDelta, decode_delta, encode_delta};
pub use encoder::DeltaEncoder;
pub use error::CodecError;
pub use record::{TrackRecord, full_record};
pub use suppression::{Lifecycle, SuppressionFilter};
pub use track::{ALTITUDE_STEP, Color, RECORD_LEN, TrackPoint, decode, encode, round_altitude};
