//! The download state machine
//!
//! `ResolvingSource → NegotiatingPermission → SelectingDirectory → Transferring
//! → [Retrying → Transferring] → Validating → Succeeded | Failed`

use super::MaterialDownloader;
use super::attempt::{AttemptContext, TransferDeadline};
use super::directory::{TargetDirectory, choose_directory};
use super::progress::ProgressReporter;
use crate::error::{Error, Result};
use crate::storage::resolve_source;
use crate::types::{
    CompletedDownload, DownloadId, DownloadOutcome, DownloadRequest, DownloadStage, Event,
};
use crate::utils::sanitize_file_name;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// A verified local copy
struct Published {
    path: PathBuf,
    bytes_written: u64,
    used_fallback_directory: bool,
    placed_in_shared_storage: bool,
}

impl MaterialDownloader {
    /// Fetch one remote file into local storage
    ///
    /// Never returns an error: every failure is folded into the
    /// [`DownloadOutcome`] so it can be shown to the user directly. The
    /// download is registered under a fresh [`DownloadId`] while it runs and
    /// can be cancelled with [`cancel`](Self::cancel) or through the token in
    /// the request's options.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use material_dl::{Config, DownloadRequest, MaterialDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let mut config = Config::default();
    ///     config.storage.base_url = "https://project.supabase.co".to_string();
    ///     let downloader = MaterialDownloader::new(config)?;
    ///
    ///     let outcome = downloader
    ///         .download(DownloadRequest::new("materials/xyz.pdf", "Calculus Notes.pdf"))
    ///         .await;
    ///
    ///     match outcome.local_path {
    ///         Some(path) if outcome.succeeded => println!("saved to {}", path.display()),
    ///         _ => println!("failed: {:?}", outcome.error_description),
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub async fn download(&self, request: DownloadRequest) -> DownloadOutcome {
        let id = self.next_download_id();
        let cancel = self.register(id, request.options.cancel.as_ref()).await;
        let outcome = self.run_download(id, &request, &cancel).await;
        self.unregister(id).await;
        outcome
    }

    /// Run a registered download to completion and build its outcome
    pub(crate) async fn run_download(
        &self,
        id: DownloadId,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> DownloadOutcome {
        match self.execute(id, request, cancel).await {
            Ok(published) => {
                self.enter_stage(id, DownloadStage::Succeeded);
                tracing::info!(
                    download_id = id.0,
                    path = %published.path.display(),
                    bytes = published.bytes_written,
                    used_fallback = published.used_fallback_directory,
                    shared = published.placed_in_shared_storage,
                    "Download complete"
                );
                self.emit_event(Event::Completed {
                    id,
                    path: published.path.clone(),
                    bytes_written: published.bytes_written,
                });

                let completed = CompletedDownload {
                    id,
                    bucket_id: request.bucket_id.clone(),
                    source_ref: request.source_ref.clone(),
                    material_id: request.material_id.clone(),
                    local_path: published.path.clone(),
                    bytes_written: published.bytes_written,
                    placed_in_shared_storage: published.placed_in_shared_storage,
                };
                self.run_post_download(&completed, request.options.share_after_download)
                    .await;

                DownloadOutcome::success(
                    published.path,
                    published.bytes_written,
                    published.used_fallback_directory,
                    published.placed_in_shared_storage,
                )
            }
            Err(e) => {
                if matches!(e, Error::Cancelled) {
                    self.enter_stage(id, DownloadStage::Cancelled);
                    tracing::info!(download_id = id.0, "Download cancelled");
                } else {
                    self.enter_stage(id, DownloadStage::Failed);
                    tracing::warn!(
                        download_id = id.0,
                        code = e.error_code(),
                        error = %e,
                        "Download failed"
                    );
                }
                self.emit_event(Event::Failed {
                    id,
                    kind: e.failure_kind(),
                    error: e.to_string(),
                });
                DownloadOutcome::failure(&e)
            }
        }
    }

    async fn execute(
        &self,
        id: DownloadId,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<Published> {
        let source_ref = request.source_ref.trim();
        let bucket = match request.bucket_id.trim() {
            "" => self.config.storage.default_bucket.as_str(),
            bucket => bucket,
        };
        let file_name = sanitize_file_name(&request.desired_file_name);

        self.emit_event(Event::Started {
            id,
            bucket_id: bucket.to_string(),
            file_name: file_name.clone(),
        });

        if source_ref.is_empty() {
            return Err(Error::InvalidRequest("source reference is empty".into()));
        }

        self.enter_stage(id, DownloadStage::ResolvingSource);
        let signed_url_timeout = request
            .options
            .signed_url_timeout
            .unwrap_or(self.config.storage.request_timeout);
        let source = resolve_source(
            self.collaborators.storage.as_ref(),
            bucket,
            source_ref,
            self.config.storage.signed_url_expiry,
            signed_url_timeout,
        )
        .await?;
        tracing::debug!(
            download_id = id.0,
            pre_signed = source.is_pre_signed,
            expires_at = ?source.expires_at,
            "Source resolved"
        );

        self.enter_stage(id, DownloadStage::NegotiatingPermission);
        let shared = self.negotiate_shared_directory(id).await;

        self.enter_stage(id, DownloadStage::SelectingDirectory);
        let documents = self.collaborators.platform.documents_directory();
        let target = choose_directory(shared, documents.clone());
        self.prepare_directory(id, &target.path).await?;

        let reporter = ProgressReporter::new(id, &request.options);
        let ctx = AttemptContext {
            id,
            url: &source.fetch_url,
            reporter: &reporter,
            cancel,
            deadline: TransferDeadline::starting_now(
                request
                    .options
                    .transfer_timeout
                    .or(self.config.transfer.transfer_timeout),
            ),
        };

        self.enter_stage(id, DownloadStage::Transferring);
        let primary_path = target.path.join(&file_name);
        match self.attempt_transfer(&ctx, &primary_path).await {
            Ok(bytes_written) => Ok(Published {
                path: primary_path,
                bytes_written,
                used_fallback_directory: false,
                placed_in_shared_storage: target.is_shared,
            }),
            Err(Error::Write(e)) if e.is_path_unavailable() && target.path != documents => {
                tracing::warn!(
                    download_id = id.0,
                    primary = %target.path.display(),
                    fallback = %documents.display(),
                    error = %e,
                    "Target directory unavailable, retrying in fallback directory"
                );
                self.retry_in_fallback(&ctx, &target, documents, &file_name)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// The single retry after a path-unavailable failure
    async fn retry_in_fallback(
        &self,
        ctx: &AttemptContext<'_>,
        primary: &TargetDirectory,
        fallback: PathBuf,
        file_name: &str,
    ) -> Result<Published> {
        self.enter_stage(ctx.id, DownloadStage::Retrying);
        self.emit_event(Event::FallbackDirectory {
            id: ctx.id,
            primary: primary.path.clone(),
            fallback: fallback.clone(),
        });

        self.prepare_directory(ctx.id, &fallback).await?;

        self.enter_stage(ctx.id, DownloadStage::Transferring);
        let path = fallback.join(file_name);
        let bytes_written = self.attempt_transfer(ctx, &path).await?;

        Ok(Published {
            path,
            bytes_written,
            used_fallback_directory: true,
            placed_in_shared_storage: false,
        })
    }
}
