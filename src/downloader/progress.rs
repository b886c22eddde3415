//! Progress event delivery

use crate::transfer::TransferObserver;
use crate::types::{DownloadId, DownloadOptions, ProgressEvent, ProgressSink};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;

/// Turns transfer byte counts into [`ProgressEvent`]s for the request's sink
///
/// Delivery never fails the transfer: a panicking callback is contained and a
/// full channel drops the update.
pub(crate) struct ProgressReporter {
    id: DownloadId,
    sink: Option<ProgressSink>,
    /// Length announced in `on_begin`, 0 when unknown
    announced_total: AtomicU64,
    /// Set once the receiving end of a channel sink is gone
    closed: AtomicBool,
}

impl ProgressReporter {
    pub(crate) fn new(id: DownloadId, options: &DownloadOptions) -> Self {
        let sink = if options.emit_progress {
            options.progress.clone()
        } else {
            None
        };

        Self {
            id,
            sink,
            announced_total: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn dispatch(&self, event: ProgressEvent) {
        let Some(sink) = &self.sink else { return };

        match sink {
            ProgressSink::Callback(callback) => {
                if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                    tracing::warn!(download_id = self.id.0, "Progress callback panicked");
                }
            }
            ProgressSink::Channel(tx) => {
                if self.closed.load(Ordering::Relaxed) {
                    return;
                }
                match tx.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::trace!(download_id = self.id.0, "Progress channel full, update dropped");
                    }
                    Err(TrySendError::Closed(_)) => {
                        self.closed.store(true, Ordering::Relaxed);
                        tracing::debug!(download_id = self.id.0, "Progress receiver dropped");
                    }
                }
            }
        }
    }
}

impl TransferObserver for ProgressReporter {
    fn on_begin(&self, status_code: u16, total_bytes: Option<u64>) {
        tracing::debug!(
            download_id = self.id.0,
            status = status_code,
            total_bytes = ?total_bytes,
            "Transfer response received"
        );
        self.announced_total
            .store(total_bytes.unwrap_or(0), Ordering::Relaxed);
    }

    fn on_progress(&self, bytes_written: u64, total_bytes: Option<u64>) {
        let total = total_bytes.unwrap_or_else(|| self.announced_total.load(Ordering::Relaxed));
        self.dispatch(ProgressEvent::new(bytes_written, total));
    }
}
