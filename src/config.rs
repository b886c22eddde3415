//! Configuration types for material-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Bucket used when a request does not name one
pub const DEFAULT_BUCKET: &str = "study-materials";

/// Object storage connection settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the backend project (e.g. "https://xyz.supabase.co")
    #[serde(default)]
    pub base_url: String,

    /// Public API key sent as the `apikey` header
    #[serde(default)]
    pub api_key: String,

    /// User session token; the API key is used as bearer token when absent
    #[serde(default)]
    pub access_token: Option<String>,

    /// Bucket used when a request does not name one (default: "study-materials")
    #[serde(default = "default_bucket")]
    pub default_bucket: String,

    /// Lifetime of minted signed URLs (default: 3600 seconds)
    #[serde(default = "default_signed_url_expiry", with = "duration_serde")]
    pub signed_url_expiry: Duration,

    /// Timeout for the signed URL exchange (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            access_token: None,
            default_bucket: default_bucket(),
            signed_url_expiry: default_signed_url_expiry(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl StorageConfig {
    /// Bearer token for authenticated requests
    pub fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }
}

/// Transfer behavior settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Upper bound for a whole transfer (default: 3600 seconds, None = unbounded)
    #[serde(
        default = "default_transfer_timeout",
        with = "optional_duration_serde"
    )]
    pub transfer_timeout: Option<Duration>,

    /// TCP connect timeout for the streaming client (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Bytes buffered in memory before each disk write (default: 256 KiB)
    #[serde(default = "default_write_buffer_size")]
    pub write_buffer_size: usize,

    /// Minimum bytes between two progress reports (default: 64 KiB)
    #[serde(default = "default_progress_interval_bytes")]
    pub progress_interval_bytes: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            transfer_timeout: default_transfer_timeout(),
            connect_timeout: default_connect_timeout(),
            write_buffer_size: default_write_buffer_size(),
            progress_interval_bytes: default_progress_interval_bytes(),
        }
    }
}

/// Target directory settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// App-private documents directory, always writable (default: "./documents")
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// Shared public "Downloads" directory (None = platform has none)
    #[serde(default)]
    pub shared_downloads_dir: Option<PathBuf>,

    /// Whether writing to the shared directory needs an explicit grant (default: false)
    #[serde(default)]
    pub shared_requires_permission: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            shared_downloads_dir: None,
            shared_requires_permission: false,
        }
    }
}

/// Remote download counter settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Register the counter as a post-download notifier (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Remote procedure to call (default: "increment_download_count")
    #[serde(default = "default_rpc_function")]
    pub rpc_function: String,

    /// Argument name carrying the material id (default: "material_id")
    #[serde(default = "default_rpc_argument")]
    pub rpc_argument: String,

    /// Request timeout (default: 10 seconds)
    #[serde(default = "default_notifier_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rpc_function: default_rpc_function(),
            rpc_argument: default_rpc_argument(),
            timeout: default_notifier_timeout(),
        }
    }
}

/// Post-download notification settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Remote download counter
    #[serde(default)]
    pub counter: CounterConfig,

    /// Upper bound for each notifier and the share sheet (default: 10 seconds)
    #[serde(default = "default_notifier_timeout", with = "duration_serde")]
    pub notifier_timeout: Duration,

    /// Capacity of the lifecycle event broadcast channel (default: 256)
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            counter: CounterConfig::default(),
            notifier_timeout: default_notifier_timeout(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Main configuration for MaterialDownloader
///
/// Fields are organized into sub-configs:
/// - [`storage`](StorageConfig) - backend URL, keys, signed URL lifetime
/// - [`transfer`](TransferConfig) - timeouts and buffering
/// - [`directories`](DirectoryConfig) - documents and shared directories
/// - [`notifications`](NotificationConfig) - counter, notifier timeout, events
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Object storage connection
    #[serde(default)]
    pub storage: StorageConfig,

    /// Transfer behavior
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Target directories
    #[serde(default)]
    pub directories: DirectoryConfig,

    /// Post-download notifications
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl Config {
    /// Parse a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check settings that have no meaningful interpretation
    pub fn validate(&self) -> Result<()> {
        if self.storage.signed_url_expiry.is_zero() {
            return Err(config_error(
                "signed URL expiry must be positive",
                "storage.signed_url_expiry",
            ));
        }
        if self.storage.default_bucket.trim().is_empty() {
            return Err(config_error(
                "default bucket must not be empty",
                "storage.default_bucket",
            ));
        }
        if self.transfer.write_buffer_size == 0 {
            return Err(config_error(
                "write buffer size must be positive",
                "transfer.write_buffer_size",
            ));
        }
        if self.directories.documents_dir.as_os_str().is_empty() {
            return Err(config_error(
                "documents directory must be set",
                "directories.documents_dir",
            ));
        }
        if !self.storage.base_url.is_empty() {
            url::Url::parse(&self.storage.base_url).map_err(|e| {
                config_error(format!("invalid base URL: {}", e), "storage.base_url")
            })?;
        }
        Ok(())
    }

    /// Validation for the REST collaborators, which need a backend to talk to
    pub(crate) fn require_backend(&self) -> Result<()> {
        if self.storage.base_url.trim().is_empty() {
            return Err(config_error(
                "base URL is required for the REST storage client",
                "storage.base_url",
            ));
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_signed_url_expiry() -> Duration {
    Duration::from_secs(3600)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_transfer_timeout() -> Option<Duration> {
    Some(Duration::from_secs(3600))
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_write_buffer_size() -> usize {
    256 * 1024
}

fn default_progress_interval_bytes() -> u64 {
    64 * 1024
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("./documents")
}

fn default_true() -> bool {
    true
}

fn default_rpc_function() -> String {
    "increment_download_count".to_string()
}

fn default_rpc_argument() -> String {
    "material_id".to_string()
}

fn default_notifier_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_event_channel_capacity() -> usize {
    256
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
