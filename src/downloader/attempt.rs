//! One transfer into a partial file, its validation and publication

use super::MaterialDownloader;
use super::progress::ProgressReporter;
use crate::error::{Error, Result, WriteError};
use crate::transfer::{TransferReport, TransferRequest};
use crate::types::{DownloadId, DownloadStage};
use crate::utils::{partial_path_for, remove_partial};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Absolute end of the transfer stage, shared by the first attempt and the retry
#[derive(Clone, Copy, Debug)]
pub(crate) struct TransferDeadline {
    pub(crate) at: Instant,
    pub(crate) limit: Duration,
}

impl TransferDeadline {
    pub(crate) fn starting_now(limit: Option<Duration>) -> Option<Self> {
        limit.map(|limit| Self {
            at: Instant::now() + limit,
            limit,
        })
    }
}

/// Everything one attempt needs besides the target path
pub(crate) struct AttemptContext<'a> {
    pub(crate) id: DownloadId,
    pub(crate) url: &'a str,
    pub(crate) reporter: &'a ProgressReporter,
    pub(crate) cancel: &'a CancellationToken,
    pub(crate) deadline: Option<TransferDeadline>,
}

/// Non-2xx status or an empty body fails the download
pub(crate) fn validate_report(report: &TransferReport) -> Result<()> {
    if !report.is_success_status() {
        return Err(Error::TransferFailed(format!(
            "server answered with HTTP {}",
            report.status_code
        )));
    }
    if report.bytes_written == 0 {
        return Err(Error::TransferFailed("no bytes were written".into()));
    }
    Ok(())
}

/// A failed rename after validation is never a fallback trigger
fn publish_error(e: WriteError) -> Error {
    match e {
        WriteError::PathUnavailable { path, source } => Error::Write(WriteError::Io { path, source }),
        other => Error::Write(other),
    }
}

impl MaterialDownloader {
    /// Transfer into a hidden partial file next to `destination`, validate it,
    /// then rename it into place
    ///
    /// The partial file is removed on every failure path, including
    /// cancellation and timeout. Returns the number of bytes published.
    pub(crate) async fn attempt_transfer(
        &self,
        ctx: &AttemptContext<'_>,
        destination: &Path,
    ) -> Result<u64> {
        let partial = partial_path_for(destination);

        let result = match self.transfer_and_validate(ctx, &partial).await {
            Ok(bytes) => self
                .collaborators
                .transfer
                .persist(&partial, destination)
                .await
                .map(|()| bytes)
                .map_err(publish_error),
            Err(e) => Err(e),
        };

        if result.is_err() {
            remove_partial(&partial).await;
        }
        result
    }

    async fn transfer_and_validate(&self, ctx: &AttemptContext<'_>, partial: &Path) -> Result<u64> {
        let transfer = self.collaborators.transfer.download_to_file(TransferRequest {
            url: ctx.url,
            destination: partial,
            observer: ctx.reporter,
            cancel: ctx.cancel,
        });

        let cancellable = async {
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => Err(Error::Cancelled),
                report = transfer => report.map_err(|e| match e {
                    WriteError::Cancelled => Error::Cancelled,
                    other => Error::Write(other),
                }),
            }
        };

        let report = match ctx.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline.at, cancellable)
                .await
                .map_err(|_| Error::Timeout {
                    stage: "transfer",
                    after: deadline.limit,
                })??,
            None => cancellable.await?,
        };

        self.enter_stage(ctx.id, DownloadStage::Validating);
        tracing::debug!(
            download_id = ctx.id.0,
            status = report.status_code,
            bytes = report.bytes_written,
            "Transfer finished"
        );
        validate_report(&report)?;

        Ok(report.bytes_written)
    }
}
