//! Core types for material-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_BUCKET;
use crate::error::{Error, FailureKind};

/// Identifier of a single download invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(pub u64);

impl DownloadId {
    /// Create a new DownloadId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for DownloadId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DownloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte-count update emitted while a transfer is in flight
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Bytes written to the local file so far
    pub bytes_written: u64,
    /// Expected size in bytes (0 when the server did not report one)
    pub total_bytes: u64,
    /// Completion percentage, always within `0.0..=100.0`
    pub percentage: f64,
}

impl ProgressEvent {
    /// Build an event, deriving a percentage that is finite even for unknown totals
    pub fn new(bytes_written: u64, total_bytes: u64) -> Self {
        let percentage = if total_bytes == 0 {
            0.0
        } else {
            (bytes_written as f64 / total_bytes as f64 * 100.0).clamp(0.0, 100.0)
        };
        Self {
            bytes_written,
            total_bytes,
            percentage,
        }
    }
}

/// Where progress events are delivered
///
/// Callbacks run on the transfer task; a panicking callback is contained and
/// logged. Channels use `try_send`, so a slow consumer loses intermediate
/// updates instead of stalling the transfer.
#[derive(Clone)]
pub enum ProgressSink {
    /// Invoke a function for each event
    Callback(Arc<dyn Fn(ProgressEvent) + Send + Sync>),
    /// Push each event into a bounded channel
    Channel(tokio::sync::mpsc::Sender<ProgressEvent>),
}

impl ProgressSink {
    /// Wrap a closure as a sink
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        ProgressSink::Callback(Arc::new(f))
    }

    /// Create a bounded channel sink and its receiving end
    pub fn channel(capacity: usize) -> (Self, tokio::sync::mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity.max(1));
        (ProgressSink::Channel(tx), rx)
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressSink::Callback(_) => f.write_str("ProgressSink::Callback"),
            ProgressSink::Channel(_) => f.write_str("ProgressSink::Channel"),
        }
    }
}

/// Per-request options
#[derive(Clone, Debug, Default)]
pub struct DownloadOptions {
    /// Forward progress events to `progress`
    pub emit_progress: bool,
    /// Open the share sheet with the local file after a successful download
    pub share_after_download: bool,
    /// Progress destination
    pub progress: Option<ProgressSink>,
    /// Caller-owned cancellation token
    pub cancel: Option<CancellationToken>,
    /// Overrides the configured signed URL timeout
    pub signed_url_timeout: Option<Duration>,
    /// Overrides the configured transfer timeout
    pub transfer_timeout: Option<Duration>,
}

impl DownloadOptions {
    /// Deliver progress to `sink`
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.emit_progress = true;
        self.progress = Some(sink);
        self
    }

    /// Open the share sheet after success
    pub fn with_share(mut self) -> Self {
        self.share_after_download = true;
        self
    }

    /// Cancel the transfer when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bound the transfer by `timeout`
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = Some(timeout);
        self
    }
}

/// A request to fetch one remote file into local storage
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    /// Object storage path or fully-qualified `http(s)` URL
    pub source_ref: String,
    /// File name for the local copy (sanitized before use)
    pub desired_file_name: String,
    /// Storage bucket the path belongs to
    pub bucket_id: String,
    /// Catalogue id of the material, used by post-download notifiers
    pub material_id: Option<String>,
    /// Per-request options
    pub options: DownloadOptions,
}

impl DownloadRequest {
    /// Request `source_ref` from the default bucket
    pub fn new(source_ref: impl Into<String>, desired_file_name: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            desired_file_name: desired_file_name.into(),
            bucket_id: DEFAULT_BUCKET.to_string(),
            material_id: None,
            options: DownloadOptions::default(),
        }
    }

    /// Use a different bucket
    pub fn with_bucket(mut self, bucket_id: impl Into<String>) -> Self {
        self.bucket_id = bucket_id.into();
        self
    }

    /// Attach the material id
    pub fn with_material_id(mut self, material_id: impl Into<String>) -> Self {
        self.material_id = Some(material_id.into());
        self
    }

    /// Replace the options
    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = options;
        self
    }
}

/// Fetch URL derived from a request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
    /// URL the transfer reads from
    pub fetch_url: String,
    /// The caller supplied a fully-qualified URL that is used verbatim
    pub is_pre_signed: bool,
    /// Expiry of a URL minted by object storage
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Terminal result of a download
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// Whether a verified local copy exists
    pub succeeded: bool,
    /// Final path of the local copy
    pub local_path: Option<PathBuf>,
    /// Bytes written to the local copy
    pub bytes_written: u64,
    /// Human-readable failure description
    pub error_description: Option<String>,
    /// Machine-readable failure class
    pub failure: Option<FailureKind>,
    /// The single fallback-directory retry was used
    pub used_fallback_directory: bool,
    /// The file landed in the shared public directory
    pub placed_in_shared_storage: bool,
}

impl DownloadOutcome {
    pub(crate) fn success(
        local_path: PathBuf,
        bytes_written: u64,
        used_fallback_directory: bool,
        placed_in_shared_storage: bool,
    ) -> Self {
        Self {
            succeeded: true,
            local_path: Some(local_path),
            bytes_written,
            error_description: None,
            failure: None,
            used_fallback_directory,
            placed_in_shared_storage,
        }
    }

    pub(crate) fn failure(error: &Error) -> Self {
        Self {
            succeeded: false,
            local_path: None,
            bytes_written: 0,
            error_description: Some(error.to_string()),
            failure: Some(error.failure_kind()),
            used_fallback_directory: false,
            placed_in_shared_storage: false,
        }
    }
}

/// Stages of a single download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStage {
    /// Deriving the fetch URL
    ResolvingSource,
    /// Asking for shared storage access
    NegotiatingPermission,
    /// Choosing and creating the target directory
    SelectingDirectory,
    /// Streaming bytes to the partial file
    Transferring,
    /// Switching to the fallback directory after a path failure
    Retrying,
    /// Checking status and byte count
    Validating,
    /// Local copy published
    Succeeded,
    /// Terminal failure
    Failed,
    /// Stopped through a cancellation token
    Cancelled,
}

impl std::fmt::Display for DownloadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DownloadStage::ResolvingSource => "resolving_source",
            DownloadStage::NegotiatingPermission => "negotiating_permission",
            DownloadStage::SelectingDirectory => "selecting_directory",
            DownloadStage::Transferring => "transferring",
            DownloadStage::Retrying => "retrying",
            DownloadStage::Validating => "validating",
            DownloadStage::Succeeded => "succeeded",
            DownloadStage::Failed => "failed",
            DownloadStage::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Summary handed to post-download notifiers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletedDownload {
    /// Invocation id
    pub id: DownloadId,
    /// Bucket the object came from
    pub bucket_id: String,
    /// Storage path or URL as requested
    pub source_ref: String,
    /// Catalogue id of the material, if the caller supplied one
    pub material_id: Option<String>,
    /// Final path of the local copy
    pub local_path: PathBuf,
    /// Bytes written
    pub bytes_written: u64,
    /// The file landed in the shared public directory
    pub placed_in_shared_storage: bool,
}

/// Lifecycle events broadcast to subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A download was accepted
    Started {
        /// Invocation id
        id: DownloadId,
        /// Bucket of the object
        bucket_id: String,
        /// Sanitized local file name
        file_name: String,
    },

    /// A download moved to a new stage
    StageChanged {
        /// Invocation id
        id: DownloadId,
        /// The stage entered
        stage: DownloadStage,
    },

    /// The primary directory was unavailable; retrying in the fallback directory
    FallbackDirectory {
        /// Invocation id
        id: DownloadId,
        /// Directory the first attempt targeted
        primary: PathBuf,
        /// Directory of the retry
        fallback: PathBuf,
    },

    /// The local copy was published
    Completed {
        /// Invocation id
        id: DownloadId,
        /// Final path
        path: PathBuf,
        /// Bytes written
        bytes_written: u64,
    },

    /// The download failed
    Failed {
        /// Invocation id
        id: DownloadId,
        /// Failure class
        kind: FailureKind,
        /// Description
        error: String,
    },

    /// The share sheet could not be shown (download still succeeded)
    ShareFailed {
        /// Invocation id
        id: DownloadId,
        /// Description
        error: String,
    },

    /// A post-download notifier failed (download still succeeded)
    NotifierFailed {
        /// Invocation id
        id: DownloadId,
        /// Notifier name
        notifier: String,
        /// Description
        error: String,
    },
}
