//! # material-dl
//!
//! Download orchestrator for study-material libraries backed by object storage.
//!
//! Given a storage path (or a ready-made URL) and a desired file name,
//! [`MaterialDownloader::download`] resolves a signed URL, negotiates access to
//! shared storage, picks a target directory, streams the file to disk with a
//! single fallback-directory retry, validates the result and reports a
//! structured [`DownloadOutcome`].
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI; the host supplies platform capabilities
//! - **Outcome, not exceptions** - Every failure is folded into the outcome
//! - **Atomic writes** - A truncated or error-page file never appears under the
//!   requested name
//! - **Event-driven** - Consumers subscribe to lifecycle events
//!
//! ## Quick Start
//!
//! ```no_run
//! use material_dl::{Config, DownloadOptions, DownloadRequest, MaterialDownloader, ProgressSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.storage.base_url = "https://project.supabase.co".to_string();
//!     config.storage.api_key = "anon-key".to_string();
//!     config.directories.documents_dir = "/data/app/documents".into();
//!
//!     let downloader = MaterialDownloader::new(config)?;
//!
//!     let (progress, mut updates) = ProgressSink::channel(32);
//!     tokio::spawn(async move {
//!         while let Some(update) = updates.recv().await {
//!             println!("{:.0}%", update.percentage);
//!         }
//!     });
//!
//!     let request = DownloadRequest::new("materials/xyz.pdf", "Calculus Notes.pdf")
//!         .with_material_id("42")
//!         .with_options(DownloadOptions::default().with_progress(progress));
//!
//!     let outcome = downloader.download(request).await;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Post-download share sheet and notifiers
pub mod notify;
/// Platform directories and write permission
pub mod platform;
/// Object storage access and signed URLs
pub mod storage;
/// Streaming transfer into local files
pub mod transfer;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DEFAULT_BUCKET};
pub use downloader::{DownloadHandle, MaterialDownloader, MaterialDownloaderBuilder};
pub use error::{Error, FailureKind, Result, WriteError};
pub use notify::{PostDownloadNotifier, RestDownloadCounter, ShareRequest, ShareSheet};
pub use platform::{
    AlwaysGranted, FixedPermission, PermissionGate, PermissionStatus, PlatformPolicy,
    StaticPlatformPolicy,
};
pub use storage::{ObjectStorage, RestObjectStorage};
pub use transfer::{FileTransfer, HttpFileTransfer};
pub use types::{
    CompletedDownload, DownloadId, DownloadOptions, DownloadOutcome, DownloadRequest,
    DownloadStage, Event, ProgressEvent, ProgressSink, ResolvedSource,
};

/// Wait for a termination signal, then cancel every running download.
///
/// Cancelled downloads remove their partial files and report `Cancelled`.
/// Returns the number of downloads that were signalled.
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use material_dl::{Config, MaterialDownloader, cancel_on_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut config = Config::default();
///     config.storage.base_url = "https://project.supabase.co".to_string();
///     let downloader = MaterialDownloader::new(config)?;
///
///     tokio::spawn(cancel_on_shutdown(downloader.clone()));
///     Ok(())
/// }
/// ```
pub async fn cancel_on_shutdown(downloader: MaterialDownloader) -> usize {
    wait_for_signal().await;
    downloader.cancel_all().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
    }
}
