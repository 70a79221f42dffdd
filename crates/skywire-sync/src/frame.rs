//! Decoding of compressed frames from the fan-out server.

use std::borrow::Cow;
use std::io::Read as _;

use flate2::read::GzDecoder;
use skywire_types::{SnapshotFrame, WsDelta};

use crate::error::SyncError;

/// First two bytes of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompress `data` if it is gzip; pass it through otherwise.
///
/// HTTP clients that honour `Content-Encoding` hand over plain JSON.
///
/// # Errors
///
/// Returns [`SyncError::Decompress`] if a gzip member is corrupt.
pub fn inflate(data: &[u8]) -> Result<Cow<'_, [u8]>, SyncError> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(data));
    }
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out)?;
    Ok(Cow::Owned(out))
}

/// Decode a delta frame received on the socket.
///
/// # Errors
///
/// Returns [`SyncError::Decompress`] or [`SyncError::Json`].
pub fn decode_frame(data: &[u8]) -> Result<WsDelta, SyncError> {
    Ok(serde_json::from_slice(&inflate(data)?)?)
}

/// Decode a snapshot body from `GET /api/snapshot`.
///
/// # Errors
///
/// Returns [`SyncError::Decompress`] or [`SyncError::Json`].
pub fn decode_snapshot(data: &[u8]) -> Result<SnapshotFrame, SyncError> {
    Ok(serde_json::from_slice(&inflate(data)?)?)
}
