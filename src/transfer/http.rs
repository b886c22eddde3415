//! Streaming HTTP transfer into a local file

use super::{FileTransfer, TransferReport, TransferRequest, WriteError};
use crate::config::TransferConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

/// [`FileTransfer`] backed by `reqwest`
///
/// The response body is streamed chunk by chunk, buffered in memory up to
/// `write_buffer_size` bytes per disk write, and reported to the observer every
/// `progress_interval_bytes`. Non-2xx answers are returned without touching the
/// destination.
pub struct HttpFileTransfer {
    client: reqwest::Client,
    write_buffer_size: usize,
    progress_interval_bytes: u64,
}

impl HttpFileTransfer {
    /// Create a transfer client from transfer settings
    ///
    /// The overall deadline is enforced by the orchestrator, so the client only
    /// carries a connect timeout.
    pub fn new(config: &TransferConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            write_buffer_size: config.write_buffer_size.max(1),
            progress_interval_bytes: config.progress_interval_bytes,
        })
    }
}

#[async_trait]
impl FileTransfer for HttpFileTransfer {
    async fn download_to_file(
        &self,
        request: TransferRequest<'_>,
    ) -> std::result::Result<TransferReport, WriteError> {
        let TransferRequest {
            url,
            destination,
            observer,
            cancel,
        } = request;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WriteError::Cancelled),
            sent = self.client.get(url).send() => sent.map_err(|e| {
                if e.is_connect() {
                    WriteError::Network(format!("connection failed: {}", e))
                } else {
                    WriteError::Network(format!("request failed: {}", e))
                }
            })?,
        };

        let status_code = response.status().as_u16();
        let total_bytes = response.content_length();
        observer.on_begin(status_code, total_bytes);

        if !response.status().is_success() {
            tracing::debug!(status = status_code, "transfer answered with non-success status");
            return Ok(TransferReport {
                status_code,
                bytes_written: 0,
                total_bytes,
            });
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| WriteError::from_io(destination, e))?;

        let mut stream = response.bytes_stream();
        let mut write_buffer = Vec::with_capacity(self.write_buffer_size);
        let mut bytes_written: u64 = 0;
        let mut last_reported: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(WriteError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk =
                chunk.map_err(|e| WriteError::Network(format!("failed to read chunk: {}", e)))?;

            write_buffer.extend_from_slice(&chunk);

            if write_buffer.len() >= self.write_buffer_size {
                file.write_all(&write_buffer)
                    .await
                    .map_err(|e| WriteError::from_io(destination, e))?;
                bytes_written += write_buffer.len() as u64;
                write_buffer.clear();

                if bytes_written - last_reported >= self.progress_interval_bytes {
                    observer.on_progress(bytes_written, total_bytes);
                    last_reported = bytes_written;
                }
            }
        }

        if !write_buffer.is_empty() {
            file.write_all(&write_buffer)
                .await
                .map_err(|e| WriteError::from_io(destination, e))?;
            bytes_written += write_buffer.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| WriteError::from_io(destination, e))?;
        file.sync_all()
            .await
            .map_err(|e| WriteError::from_io(destination, e))?;

        if bytes_written != last_reported {
            observer.on_progress(bytes_written, total_bytes);
        }

        Ok(TransferReport {
            status_code,
            bytes_written,
            total_bytes,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
