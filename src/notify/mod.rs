//! Post-download side effects
//!
//! After a download succeeds the orchestrator runs a list of best-effort
//! capabilities. Each one is isolated: an error, a panic or a timeout is logged
//! and broadcast, and never changes the reported outcome.
//!
//! - [`ShareSheet`]: hands the local file to the platform share/send sheet
//! - [`PostDownloadNotifier`]: any other side effect, such as
//!   [`RestDownloadCounter`]

mod counter;

pub use counter::RestDownloadCounter;

use crate::types::CompletedDownload;
use async_trait::async_trait;
use std::path::PathBuf;

/// What to hand to the share sheet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareRequest {
    /// Local file to share
    pub file: PathBuf,
    /// Title shown by the sheet
    pub title: String,
}

/// Platform share/send sheet
#[async_trait]
pub trait ShareSheet: Send + Sync {
    /// Present the sheet for `request.file`
    async fn share(&self, request: ShareRequest) -> crate::Result<()>;
}

/// Best-effort side effect run after every successful download
#[async_trait]
pub trait PostDownloadNotifier: Send + Sync {
    /// React to a completed download
    async fn on_downloaded(&self, download: &CompletedDownload) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
