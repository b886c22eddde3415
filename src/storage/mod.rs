//! Object storage access and source resolution
//!
//! The orchestrator never talks to storage directly; it goes through the
//! [`ObjectStorage`] trait so hosts can plug in their own backend and tests can
//! substitute an in-process mock.
//!
//! - [`RestObjectStorage`]: REST client for the backend's storage API
//! - [`resolve_source`]: turns a request's source reference into a fetch URL

mod rest;

pub use rest::RestObjectStorage;

use crate::error::{Error, Result};
use crate::types::ResolvedSource;
use crate::utils::is_absolute_url;
use async_trait::async_trait;
use std::time::Duration;

/// Object storage capable of minting time-limited fetch URLs
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Exchange an object path for a signed URL valid for `expiry`
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist, the caller lacks access,
    /// or the backend could not be reached.
    async fn create_signed_url(&self, bucket: &str, path: &str, expiry: Duration)
    -> Result<String>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Derive the fetch URL for `source_ref`
///
/// Fully-qualified `http(s)` URLs are used verbatim. Anything else is treated as
/// an object path in `bucket` and exchanged for a signed URL. The exchange is
/// bounded by `timeout`; failures are terminal and never retried, since a
/// failed signing request almost always means the object is missing.
pub async fn resolve_source(
    storage: &dyn ObjectStorage,
    bucket: &str,
    source_ref: &str,
    expiry: Duration,
    timeout: Duration,
) -> Result<ResolvedSource> {
    let source_ref = source_ref.trim();
    if is_absolute_url(source_ref) {
        tracing::debug!(url = %source_ref, "using fully-qualified source URL verbatim");
        return Ok(ResolvedSource {
            fetch_url: source_ref.to_string(),
            is_pre_signed: true,
            expires_at: None,
        });
    }

    let signed = tokio::time::timeout(
        timeout,
        storage.create_signed_url(bucket, source_ref, expiry),
    )
    .await
    .map_err(|_| Error::Timeout {
        stage: "signed URL request",
        after: timeout,
    })?
    .map_err(|e| match e {
        Error::SourceResolutionFailed(msg) => Error::SourceResolutionFailed(msg),
        other => Error::SourceResolutionFailed(other.to_string()),
    })?;

    if signed.trim().is_empty() {
        return Err(Error::SourceResolutionFailed(
            "storage returned an empty URL".into(),
        ));
    }

    let expires_at = chrono::Duration::from_std(expiry)
        .ok()
        .map(|d| chrono::Utc::now() + d);

    tracing::debug!(
        bucket = %bucket,
        path = %source_ref,
        storage = storage.name(),
        "signed URL created"
    );

    Ok(ResolvedSource {
        fetch_url: signed,
        is_pre_signed: false,
        expires_at,
    })
}
