//! Download coordination
//!
//! `Downloader::acquire` is the single entry point for turning a video
//! identifier into local bytes. It checks the disk cache first, then joins
//! or starts the one in-flight transfer for that identifier. Partial
//! downloads are staged under a `.part` name and promoted by atomic rename
//! only after the transfer completes, so a visible cache entry is always a
//! complete file.

pub mod flight;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::DiskCache;
use crate::error::{Error, Result};
use crate::identifier::VideoId;
use crate::remote::RemoteExecutor;

pub use flight::{FlightError, FlightGroup};

/// Clonable failure shared between a transfer's leader and its waiters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransferError {
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Failed(String),
}

impl TransferError {
    fn from_core(err: &Error) -> Self {
        match err {
            Error::UpstreamUnavailable(msg) => Self::Upstream(msg.clone()),
            other => Self::Failed(other.to_string()),
        }
    }
}

impl From<TransferError> for Error {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Upstream(msg) => Self::UpstreamUnavailable(msg),
            TransferError::Failed(msg) => Self::TransferFailed(msg),
        }
    }
}

pub struct Downloader {
    cache: Arc<DiskCache>,
    executor: Arc<dyn RemoteExecutor>,
    freshness: Duration,
    flights: FlightGroup<String, PathBuf, TransferError>,
}

impl Downloader {
    pub fn new(cache: Arc<DiskCache>, executor: Arc<dyn RemoteExecutor>, freshness: Duration) -> Self {
        Self {
            cache,
            executor,
            freshness,
            flights: FlightGroup::new(),
        }
    }

    /// Resolve `id` to a local file, downloading from the origin on demand.
    ///
    /// Concurrent callers for the same identifier observe one shared
    /// transfer and its one outcome. No retry happens here; a later call
    /// may retry cleanly after a failure.
    pub async fn acquire(&self, id: &VideoId, remote_path: &str, server_id: &str) -> Result<PathBuf> {
        if let Some(entry) = self.cache.entry_fresh(id, self.freshness) {
            debug!(%id, "cache hit");
            return Ok(entry.local_path);
        }

        let cache = self.cache.clone();
        let executor = self.executor.clone();
        let freshness = self.freshness;
        let flight_id = id.clone();
        let flight_path = remote_path.to_string();
        let flight_server = server_id.to_string();

        let result = self
            .flights
            .run(id.as_str().to_string(), async move {
                // A transfer that finished while we waited for leadership
                // is a hit for us too.
                if let Some(entry) = cache.entry_fresh(&flight_id, freshness) {
                    return Ok(entry.local_path);
                }

                let dest = cache.entry_path(&flight_id, &flight_path);
                let part = cache.partial_path(&flight_id, &flight_path);

                match executor
                    .transfer_in(&flight_server, &flight_path, &part)
                    .await
                {
                    Ok(bytes) => {
                        if let Err(e) = tokio::fs::rename(&part, &dest).await {
                            let _ = tokio::fs::remove_file(&part).await;
                            return Err(TransferError::Failed(format!(
                                "failed to finalize cache entry: {e}"
                            )));
                        }
                        info!(id = %flight_id, bytes, "download complete");
                        Ok(dest)
                    }
                    Err(e) => {
                        let _ = tokio::fs::remove_file(&part).await;
                        warn!(id = %flight_id, error = %e, "download failed, partial discarded");
                        Err(TransferError::from_core(&e))
                    }
                }
            })
            .await;

        result.map_err(|err| match err {
            FlightError::LeaderFailed => {
                Error::TransferFailed("download aborted before completion".to_string())
            }
            FlightError::Inner(inner) => inner.into(),
        })
    }
}
