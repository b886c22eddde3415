//! Platform storage policy and write-permission negotiation
//!
//! Platform differences are expressed through two injected capabilities instead
//! of branching on the operating system inside the download flow:
//!
//! - [`PlatformPolicy`]: which directories exist and whether the shared one
//!   needs an explicit grant
//! - [`PermissionGate`]: asks the user (or host) for that grant
//!
//! Denial is never an error. It only steers the orchestrator to the private
//! documents directory, which is always writable.

mod policies;

pub use policies::{AlwaysGranted, FixedPermission, StaticPlatformPolicy};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of a permission request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// Shared storage may be written
    Granted,
    /// Shared storage must not be used
    Denied,
}

impl PermissionStatus {
    /// Whether the grant was given
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Directory layout of the host platform
pub trait PlatformPolicy: Send + Sync {
    /// Shared public "Downloads" directory, if the platform has one
    fn default_shared_directory(&self) -> Option<PathBuf>;

    /// Whether writing to the shared directory requires an explicit grant
    fn requires_explicit_write_permission(&self) -> bool;

    /// App-private documents directory
    fn documents_directory(&self) -> PathBuf;
}

/// Requests write access to shared storage
///
/// Implementations may suspend for as long as the platform dialog is open.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Ask for permission to write to shared storage
    ///
    /// # Errors
    ///
    /// Errors are treated exactly like [`PermissionStatus::Denied`].
    async fn request_write_permission(&self) -> crate::Result<PermissionStatus>;
}
