//! Core downloader implementation split into focused submodules.
//!
//! The `MaterialDownloader` struct and its methods are organized by stage:
//! - [`builder`] - Collaborator injection and construction
//! - [`orchestration`] - The `download` entry point and its state machine
//! - [`directory`] - Permission negotiation and target directory selection
//! - [`attempt`] - One transfer into a partial file, validation and publication
//! - [`progress`] - Translation of byte counts into progress events
//! - [`post_download`] - Best-effort share sheet and notifiers
//! - [`control`] - Background spawning and cancellation

mod attempt;
mod builder;
mod control;
mod directory;
mod orchestration;
mod post_download;
mod progress;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use builder::MaterialDownloaderBuilder;
pub use control::DownloadHandle;

use crate::config::Config;
use crate::error::Result;
use crate::notify::{PostDownloadNotifier, ShareSheet};
use crate::platform::{PermissionGate, PlatformPolicy};
use crate::storage::ObjectStorage;
use crate::transfer::FileTransfer;
use crate::types::{DownloadId, DownloadStage, Event};
use std::sync::Arc;

/// Capabilities the orchestrator delegates to
#[derive(Clone)]
pub(crate) struct Collaborators {
    /// Signs object paths
    pub(crate) storage: Arc<dyn ObjectStorage>,
    /// Directory layout of the host
    pub(crate) platform: Arc<dyn PlatformPolicy>,
    /// Shared storage write permission
    pub(crate) permissions: Arc<dyn PermissionGate>,
    /// Filesystem and streaming transfer
    pub(crate) transfer: Arc<dyn FileTransfer>,
    /// Share sheet, if the host has one
    pub(crate) share_sheet: Option<Arc<dyn ShareSheet>>,
    /// Run after every successful download
    pub(crate) notifiers: Arc<Vec<Arc<dyn PostDownloadNotifier>>>,
}

/// Registry of in-flight downloads
#[derive(Clone, Default)]
pub(crate) struct ActiveDownloads {
    /// Cancellation token of every running download
    pub(crate) tokens: Arc<
        tokio::sync::Mutex<
            std::collections::HashMap<DownloadId, tokio_util::sync::CancellationToken>,
        >,
    >,
    /// Next invocation id
    pub(crate) next_id: Arc<std::sync::atomic::AtomicU64>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MaterialDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Injected capabilities
    pub(crate) collaborators: Collaborators,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cancellation registry
    pub(crate) active: ActiveDownloads,
}

impl MaterialDownloader {
    /// Create a downloader with the REST storage client, HTTP transfer and
    /// directories taken from `config`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is
    /// invalid or has no backend base URL.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use material_dl::{Config, MaterialDownloader};
    ///
    /// # fn example() -> material_dl::Result<()> {
    /// let mut config = Config::default();
    /// config.storage.base_url = "https://project.supabase.co".to_string();
    /// config.storage.api_key = "anon-key".to_string();
    ///
    /// let downloader = MaterialDownloader::new(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start building a downloader with custom collaborators
    pub fn builder(config: Config) -> MaterialDownloaderBuilder {
        MaterialDownloaderBuilder::new(config)
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than `event_channel_capacity` events
    /// receives a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use material_dl::{Config, MaterialDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let mut config = Config::default();
    ///     config.storage.base_url = "https://project.supabase.co".to_string();
    ///     let downloader = MaterialDownloader::new(config)?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "download event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Log and broadcast a stage transition
    pub(crate) fn enter_stage(&self, id: DownloadId, stage: DownloadStage) {
        tracing::debug!(download_id = id.0, stage = %stage, "Download stage changed");
        self.emit_event(Event::StageChanged { id, stage });
    }
}
