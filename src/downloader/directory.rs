//! Permission negotiation and target directory selection

use super::MaterialDownloader;
use crate::error::{Error, Result};
use crate::types::DownloadId;
use std::path::{Path, PathBuf};

/// Directory a transfer writes into
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TargetDirectory {
    pub(crate) path: PathBuf,
    /// The directory is the shared public one
    pub(crate) is_shared: bool,
}

/// Prefer the shared directory when one is usable
pub(crate) fn choose_directory(shared: Option<PathBuf>, documents: PathBuf) -> TargetDirectory {
    match shared {
        Some(path) => TargetDirectory {
            path,
            is_shared: true,
        },
        None => TargetDirectory {
            path: documents,
            is_shared: false,
        },
    }
}

impl MaterialDownloader {
    /// Shared directory the download may write to, if any
    ///
    /// The gate is only consulted when the platform has a shared directory and
    /// requires an explicit grant for it. Denial, and a failing gate, fall
    /// back to the documents directory.
    pub(crate) async fn negotiate_shared_directory(&self, id: DownloadId) -> Option<PathBuf> {
        let platform = &self.collaborators.platform;
        let shared = platform.default_shared_directory()?;

        if !platform.requires_explicit_write_permission() {
            return Some(shared);
        }

        match self.collaborators.permissions.request_write_permission().await {
            Ok(status) if status.is_granted() => {
                tracing::debug!(download_id = id.0, "Shared storage permission granted");
                Some(shared)
            }
            Ok(_) => {
                tracing::info!(
                    download_id = id.0,
                    "Shared storage permission denied, using documents directory"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    download_id = id.0,
                    error = %e,
                    "Permission request failed, using documents directory"
                );
                None
            }
        }
    }

    /// Create `dir` if needed
    ///
    /// An existing directory is fine; any other failure is terminal.
    pub(crate) async fn prepare_directory(&self, id: DownloadId, dir: &Path) -> Result<()> {
        self.collaborators
            .transfer
            .create_dir(dir)
            .await
            .map_err(|e| {
                tracing::error!(
                    download_id = id.0,
                    dir = %dir.display(),
                    error = %e,
                    "Failed to create target directory"
                );
                Error::TransferFailed(format!(
                    "could not create directory {}: {}",
                    dir.display(),
                    e
                ))
            })
    }
}
