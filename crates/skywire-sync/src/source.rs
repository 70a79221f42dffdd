//! Where the synchronizer fetches snapshots from.

use std::future::Future;

use skywire_types::SnapshotFrame;
use tracing::debug;

use crate::error::SyncError;
use crate::frame::decode_snapshot;

/// A source of complete snapshots.
pub trait SnapshotSource {
    /// Fetch the latest snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the snapshot cannot be fetched or decoded.
    fn fetch_snapshot(&self) -> impl Future<Output = Result<SnapshotFrame, SyncError>> + Send;
}

/// [`SnapshotSource`] reading `GET /api/snapshot` from a fan-out server.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotSource {
    /// A source for the fan-out server at `base_url`, e.g.
    /// `http://localhost:8080`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Like [`HttpSnapshotSource::new`] with a preconfigured client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/api/snapshot", base_url.trim_end_matches('/')),
        }
    }

    /// The snapshot endpoint being read.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_snapshot(&self) -> Result<SnapshotFrame, SyncError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| SyncError::Http {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| SyncError::Http {
            url: self.url.clone(),
            source,
        })?;
        debug!(url = %self.url, bytes = body.len(), "snapshot fetched");
        decode_snapshot(&body)
    }
}
