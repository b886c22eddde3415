//! Best-effort side effects after a successful download

use super::MaterialDownloader;
use crate::error::{Error, Result};
use crate::notify::ShareRequest;
use crate::types::{CompletedDownload, Event};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

impl MaterialDownloader {
    /// Share the file if requested, then run every notifier
    ///
    /// Failures are logged and broadcast; the download's outcome is already
    /// decided and never changes here.
    pub(crate) async fn run_post_download(&self, completed: &CompletedDownload, share: bool) {
        let limit = self.config.notifications.notifier_timeout;

        if share {
            match &self.collaborators.share_sheet {
                Some(sheet) => {
                    let request = ShareRequest {
                        file: completed.local_path.clone(),
                        title: completed
                            .local_path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                    };
                    if let Err(e) = guarded("share sheet", limit, sheet.share(request)).await {
                        tracing::warn!(download_id = completed.id.0, error = %e, "Share sheet failed");
                        self.emit_event(Event::ShareFailed {
                            id: completed.id,
                            error: e.to_string(),
                        });
                    }
                }
                None => tracing::debug!(
                    download_id = completed.id.0,
                    "Share requested but no share sheet is configured"
                ),
            }
        }

        for notifier in self.collaborators.notifiers.iter() {
            if let Err(e) = guarded(notifier.name(), limit, notifier.on_downloaded(completed)).await {
                tracing::warn!(
                    download_id = completed.id.0,
                    notifier = notifier.name(),
                    error = %e,
                    "Post-download notifier failed"
                );
                self.emit_event(Event::NotifierFailed {
                    id: completed.id,
                    notifier: notifier.name().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Run `step` with a timeout, turning a panic into an error
async fn guarded<F>(name: &'static str, limit: Duration, step: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match tokio::time::timeout(limit, AssertUnwindSafe(step).catch_unwind()).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(Error::Other(format!(
            "{} panicked: {}",
            name,
            panic_message(&*panic)
        ))),
        Err(_) => Err(Error::Timeout {
            stage: name,
            after: limit,
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
