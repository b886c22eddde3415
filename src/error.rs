//! Error types for material-dl
//!
//! This module provides the error taxonomy of the library:
//! - [`Error`], the crate-wide error returned by collaborators and internal steps
//! - [`WriteError`], the typed classification returned by the filesystem seam
//! - [`FailureKind`], the machine-readable failure reported in a
//!   [`DownloadOutcome`](crate::types::DownloadOutcome)
//!
//! Downloads themselves never return an `Err` to the caller: terminal failures
//! are folded into the outcome so UI code can present a message directly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for material-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for material-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed request (empty source reference and similar caller bugs)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A fetch URL could not be derived from the storage reference
    #[error("Failed to create signed URL: {0}")]
    SourceResolutionFailed(String),

    /// Transfer failed: non-2xx status, zero bytes, or an unrecoverable write error
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// Filesystem or transfer primitive failure
    #[error(transparent)]
    Write(#[from] WriteError),

    /// The download was cancelled while transferring
    #[error("download cancelled")]
    Cancelled,

    /// A stage exceeded its configured timeout
    #[error("{stage} timed out after {after:?}")]
    Timeout {
        /// The stage that timed out (e.g. "signed URL request", "transfer")
        stage: &'static str,
        /// The configured limit that was exceeded
        after: Duration,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "storage.base_url")
        key: Option<String>,
    },

    /// No active download with the given id
    #[error("download not found: {0}")]
    NotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classify this error into the failure kind reported to callers
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::InvalidRequest(_) | Error::Config { .. } => FailureKind::InvalidRequest,
            Error::SourceResolutionFailed(_) => FailureKind::SourceResolutionFailed,
            Error::Cancelled | Error::Write(WriteError::Cancelled) => FailureKind::Cancelled,
            Error::Timeout { .. } => FailureKind::TimedOut,
            Error::TransferFailed(_)
            | Error::Write(_)
            | Error::NotFound(_)
            | Error::Io(_)
            | Error::Network(_)
            | Error::Serialization(_)
            | Error::Other(_) => FailureKind::TransferFailed,
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::SourceResolutionFailed(_) => "source_resolution_failed",
            Error::TransferFailed(_) => "transfer_failed",
            Error::Write(WriteError::PathUnavailable { .. }) => "path_unavailable",
            Error::Write(WriteError::Cancelled) => "cancelled",
            Error::Write(WriteError::Network(_)) => "network_error",
            Error::Write(WriteError::Io { .. }) => "io_error",
            Error::Cancelled => "cancelled",
            Error::Timeout { .. } => "timeout",
            Error::Config { .. } => "config_error",
            Error::NotFound(_) => "not_found",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }
}

/// Typed classification of filesystem and transfer failures
///
/// The orchestrator decides whether to retry in the fallback directory by
/// matching on [`WriteError::PathUnavailable`] rather than inspecting messages.
#[derive(Debug, Error)]
pub enum WriteError {
    /// A path component does not exist or is not a directory (ENOENT class)
    #[error("path unavailable: {}: {source}", path.display())]
    PathUnavailable {
        /// The path that could not be written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Any other local I/O failure
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path being written or created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The remote side failed (connect, read, decode)
    #[error("network error: {0}")]
    Network(String),

    /// The transfer observed its cancellation token
    #[error("transfer cancelled")]
    Cancelled,
}

impl WriteError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory => {
                WriteError::PathUnavailable { path, source }
            }
            _ => WriteError::Io { path, source },
        }
    }

    /// Whether this failure should trigger the fallback-directory retry
    pub fn is_path_unavailable(&self) -> bool {
        matches!(self, WriteError::PathUnavailable { .. })
    }
}

/// Machine-readable failure class of an unsuccessful download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed input (caller bug)
    InvalidRequest,
    /// Signed URL could not be produced
    SourceResolutionFailed,
    /// Non-2xx status, zero bytes, or unrecoverable write error
    TransferFailed,
    /// Cancelled by the caller
    Cancelled,
    /// A configured timeout elapsed
    TimedOut,
}
