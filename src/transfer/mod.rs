//! Local filesystem and streaming transfer primitive
//!
//! [`FileTransfer`] is the seam between the orchestrator and the bytes on disk.
//! It reports failures as a typed [`WriteError`] so the fallback-directory
//! retry is decided by matching on [`WriteError::PathUnavailable`].
//!
//! - [`HttpFileTransfer`]: streams an HTTP(S) response body into a local file

mod http;

pub use crate::error::WriteError;
pub use http::HttpFileTransfer;

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Receives transfer lifecycle callbacks
///
/// Called from the transfer task; implementations must not block.
pub trait TransferObserver: Send + Sync {
    /// The server answered; `total_bytes` is the announced length, if any
    fn on_begin(&self, _status_code: u16, _total_bytes: Option<u64>) {}

    /// `bytes_written` bytes have reached the destination so far
    fn on_progress(&self, bytes_written: u64, total_bytes: Option<u64>);
}

/// Observer that ignores every callback
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl TransferObserver for NoopObserver {
    fn on_progress(&self, _bytes_written: u64, _total_bytes: Option<u64>) {}
}

/// One transfer of `url` into `destination`
pub struct TransferRequest<'a> {
    /// Fetch URL
    pub url: &'a str,
    /// File to create (its parent directory must exist)
    pub destination: &'a Path,
    /// Progress receiver
    pub observer: &'a dyn TransferObserver,
    /// Checked at least once per received chunk
    pub cancel: &'a CancellationToken,
}

/// What a finished transfer reports back
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferReport {
    /// HTTP-equivalent status of the fetch
    pub status_code: u16,
    /// Bytes written to the destination
    pub bytes_written: u64,
    /// Length announced by the server, if any
    pub total_bytes: Option<u64>,
}

impl TransferReport {
    /// Whether `status_code` is in the 2xx range
    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Filesystem operations the orchestrator needs
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Create `path` and its parents; an existing directory is not an error
    async fn create_dir(&self, path: &Path) -> Result<(), WriteError> {
        match tokio::fs::create_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(WriteError::from_io(path, e)),
        }
    }

    /// Move a finished partial file onto its final name
    ///
    /// Both paths live in the same directory, so the rename is atomic and an
    /// existing file at `destination` is replaced whole.
    async fn persist(&self, partial: &Path, destination: &Path) -> Result<(), WriteError> {
        tokio::fs::rename(partial, destination)
            .await
            .map_err(|e| WriteError::from_io(destination, e))
    }

    /// Stream `request.url` into `request.destination`
    ///
    /// A non-2xx answer is reported through [`TransferReport::status_code`]
    /// rather than as an error; the caller decides what counts as success.
    ///
    /// # Errors
    ///
    /// - [`WriteError::PathUnavailable`] if the destination directory vanished
    /// - [`WriteError::Io`] for other local write failures
    /// - [`WriteError::Network`] if the remote side failed mid-stream
    /// - [`WriteError::Cancelled`] if the token fired
    async fn download_to_file(
        &self,
        request: TransferRequest<'_>,
    ) -> Result<TransferReport, WriteError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
