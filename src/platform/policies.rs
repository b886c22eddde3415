//! Built-in platform policies and permission gates

use super::{PermissionGate, PermissionStatus, PlatformPolicy};
use crate::config::DirectoryConfig;
use async_trait::async_trait;
use std::path::PathBuf;

/// Policy with fixed directories, usually built from [`DirectoryConfig`]
#[derive(Clone, Debug)]
pub struct StaticPlatformPolicy {
    documents_dir: PathBuf,
    shared_dir: Option<PathBuf>,
    requires_permission: bool,
}

impl StaticPlatformPolicy {
    /// Policy with only a private documents directory
    pub fn private_only(documents_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
            shared_dir: None,
            requires_permission: false,
        }
    }

    /// Add a shared directory, optionally guarded by a permission grant
    pub fn with_shared(mut self, shared_dir: impl Into<PathBuf>, requires_permission: bool) -> Self {
        self.shared_dir = Some(shared_dir.into());
        self.requires_permission = requires_permission;
        self
    }
}

impl From<&DirectoryConfig> for StaticPlatformPolicy {
    fn from(config: &DirectoryConfig) -> Self {
        Self {
            documents_dir: config.documents_dir.clone(),
            shared_dir: config.shared_downloads_dir.clone(),
            requires_permission: config.shared_requires_permission,
        }
    }
}

impl PlatformPolicy for StaticPlatformPolicy {
    fn default_shared_directory(&self) -> Option<PathBuf> {
        self.shared_dir.clone()
    }

    fn requires_explicit_write_permission(&self) -> bool {
        self.requires_permission
    }

    fn documents_directory(&self) -> PathBuf {
        self.documents_dir.clone()
    }
}

/// Gate for platforms without a permission concept
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysGranted;

#[async_trait]
impl PermissionGate for AlwaysGranted {
    async fn request_write_permission(&self) -> crate::Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }
}

/// Gate answering with a preconfigured status, for headless hosts
#[derive(Clone, Copy, Debug)]
pub struct FixedPermission(pub PermissionStatus);

#[async_trait]
impl PermissionGate for FixedPermission {
    async fn request_write_permission(&self) -> crate::Result<PermissionStatus> {
        Ok(self.0)
    }
}
