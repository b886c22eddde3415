//! Download lifecycle control (spawn, cancel, registry).

use super::MaterialDownloader;
use crate::error::{Error, Result};
use crate::types::{DownloadId, DownloadOutcome, DownloadRequest};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

/// A download running on the tokio runtime
///
/// Dropping the handle detaches the task; the download keeps running.
pub struct DownloadHandle {
    id: DownloadId,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<DownloadOutcome>,
}

impl DownloadHandle {
    /// Id of the running download
    pub fn id(&self) -> DownloadId {
        self.id
    }

    /// Request cancellation; the outcome reports `Cancelled` if the transfer was
    /// still in flight
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the download to finish
    pub async fn outcome(self) -> DownloadOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(download_id = self.id.0, error = %e, "Download task panicked");
                DownloadOutcome::failure(&Error::Other(format!("download task failed: {}", e)))
            }
        }
    }
}

impl MaterialDownloader {
    /// Run `request` in a background task
    ///
    /// The download is registered before this returns, so
    /// [`cancel`](Self::cancel) with the handle's id never races the start.
    pub async fn spawn(&self, request: DownloadRequest) -> DownloadHandle {
        let id = self.next_download_id();
        let cancel = self.register(id, request.options.cancel.as_ref()).await;

        let downloader = self.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = downloader.run_download(id, &request, &task_cancel).await;
            downloader.unregister(id).await;
            outcome
        });

        DownloadHandle { id, cancel, task }
    }

    /// Cancel a running download
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no download with this id is running.
    pub async fn cancel(&self, id: DownloadId) -> Result<()> {
        let active = self.active.tokens.lock().await;
        match active.get(&id) {
            Some(token) => {
                token.cancel();
                tracing::info!(download_id = id.0, "Download cancellation requested");
                Ok(())
            }
            None => Err(Error::NotFound(format!("download {} is not running", id))),
        }
    }

    /// Cancel every running download, returning how many were signalled
    pub async fn cancel_all(&self) -> usize {
        let active = self.active.tokens.lock().await;
        for token in active.values() {
            token.cancel();
        }
        if !active.is_empty() {
            tracing::info!(count = active.len(), "Cancelling all downloads");
        }
        active.len()
    }

    /// Ids of the downloads currently running, in start order
    pub async fn active_downloads(&self) -> Vec<DownloadId> {
        let active = self.active.tokens.lock().await;
        let mut ids: Vec<DownloadId> = active.keys().copied().collect();
        ids.sort();
        ids
    }

    pub(crate) fn next_download_id(&self) -> DownloadId {
        DownloadId(self.active.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Track a download; the returned token is cancelled by
    /// [`cancel`](Self::cancel) and by the caller's token, if any
    pub(crate) async fn register(
        &self,
        id: DownloadId,
        caller: Option<&CancellationToken>,
    ) -> CancellationToken {
        let token = caller.map_or_else(CancellationToken::new, CancellationToken::child_token);
        self.active.tokens.lock().await.insert(id, token.clone());
        token
    }

    pub(crate) async fn unregister(&self, id: DownloadId) {
        self.active.tokens.lock().await.remove(&id);
    }
}
