//! Collaborator injection

use super::{ActiveDownloads, Collaborators, MaterialDownloader};
use crate::config::Config;
use crate::error::Result;
use crate::notify::{PostDownloadNotifier, RestDownloadCounter, ShareSheet};
use crate::platform::{AlwaysGranted, PermissionGate, PlatformPolicy, StaticPlatformPolicy};
use crate::storage::{ObjectStorage, RestObjectStorage};
use crate::transfer::{FileTransfer, HttpFileTransfer};
use std::sync::Arc;

/// Builder for [`MaterialDownloader`]
///
/// Every collaborator left unset falls back to the implementation derived from
/// the configuration:
///
/// | Collaborator | Default |
/// |---|---|
/// | storage | [`RestObjectStorage`] (needs `storage.base_url`) |
/// | platform | [`StaticPlatformPolicy`] from `directories` |
/// | permission gate | [`AlwaysGranted`] |
/// | transfer | [`HttpFileTransfer`] |
/// | share sheet | none |
///
/// [`RestDownloadCounter`] is appended to the notifiers when
/// `notifications.counter.enabled` is set and a base URL is configured.
pub struct MaterialDownloaderBuilder {
    config: Config,
    storage: Option<Arc<dyn ObjectStorage>>,
    platform: Option<Arc<dyn PlatformPolicy>>,
    permissions: Option<Arc<dyn PermissionGate>>,
    transfer: Option<Arc<dyn FileTransfer>>,
    share_sheet: Option<Arc<dyn ShareSheet>>,
    notifiers: Vec<Arc<dyn PostDownloadNotifier>>,
}

impl MaterialDownloaderBuilder {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            storage: None,
            platform: None,
            permissions: None,
            transfer: None,
            share_sheet: None,
            notifiers: Vec::new(),
        }
    }

    /// Use a custom object storage
    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use a custom platform policy
    pub fn with_platform(mut self, platform: Arc<dyn PlatformPolicy>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Use a custom permission gate
    pub fn with_permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.permissions = Some(gate);
        self
    }

    /// Use a custom transfer primitive
    pub fn with_transfer(mut self, transfer: Arc<dyn FileTransfer>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Attach the platform share sheet
    pub fn with_share_sheet(mut self, share_sheet: Arc<dyn ShareSheet>) -> Self {
        self.share_sheet = Some(share_sheet);
        self
    }

    /// Register a post-download notifier; notifiers run in registration order
    pub fn with_notifier(mut self, notifier: Arc<dyn PostDownloadNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Validate the configuration and assemble the downloader
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is
    /// invalid, or if the REST storage client is needed and no base URL is set.
    pub fn build(self) -> Result<MaterialDownloader> {
        let config = self.config;
        config.validate()?;

        let storage: Arc<dyn ObjectStorage> = match self.storage {
            Some(storage) => storage,
            None => {
                config.require_backend()?;
                Arc::new(RestObjectStorage::new(&config.storage)?)
            }
        };

        let platform: Arc<dyn PlatformPolicy> = self
            .platform
            .unwrap_or_else(|| Arc::new(StaticPlatformPolicy::from(&config.directories)));

        let permissions: Arc<dyn PermissionGate> =
            self.permissions.unwrap_or_else(|| Arc::new(AlwaysGranted));

        let transfer: Arc<dyn FileTransfer> = match self.transfer {
            Some(transfer) => transfer,
            None => Arc::new(HttpFileTransfer::new(&config.transfer)?),
        };

        let mut notifiers = self.notifiers;
        let counter = &config.notifications.counter;
        if counter.enabled && !config.storage.base_url.trim().is_empty() {
            notifiers.push(Arc::new(RestDownloadCounter::new(&config.storage, counter)?));
        }

        tracing::info!(
            storage = storage.name(),
            transfer = transfer.name(),
            notifiers = notifiers.len(),
            share_sheet = self.share_sheet.is_some(),
            "Material downloader initialized"
        );

        let (event_tx, _rx) =
            tokio::sync::broadcast::channel(config.notifications.event_channel_capacity.max(1));

        Ok(MaterialDownloader {
            config: Arc::new(config),
            collaborators: Collaborators {
                storage,
                platform,
                permissions,
                transfer,
                share_sheet: self.share_sheet,
                notifiers: Arc::new(notifiers),
            },
            event_tx,
            active: ActiveDownloads::default(),
        })
    }
}
