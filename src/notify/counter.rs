//! Remote download counter

use super::PostDownloadNotifier;
use crate::config::{CounterConfig, StorageConfig};
use crate::error::{Error, Result};
use crate::types::CompletedDownload;
use async_trait::async_trait;

/// Increments a material's download count through a remote procedure call
///
/// Speaks `POST {base_url}/rest/v1/rpc/{rpc_function}` with body
/// `{"{rpc_argument}": material_id}`. Registered as a notifier it only fires
/// for requests that carried a material id; callers may also invoke
/// [`increment`](Self::increment) directly.
pub struct RestDownloadCounter {
    client: reqwest::Client,
    endpoint: String,
    rpc_argument: String,
    api_key: String,
    bearer: String,
}

impl RestDownloadCounter {
    /// Create a counter client
    pub fn new(storage: &StorageConfig, counter: &CounterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(counter.timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/rest/v1/rpc/{}",
                storage.base_url.trim_end_matches('/'),
                urlencoding::encode(&counter.rpc_function)
            ),
            rpc_argument: counter.rpc_argument.clone(),
            api_key: storage.api_key.clone(),
            bearer: storage.bearer_token().to_string(),
        })
    }

    /// Increment the download count of `material_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend answers non-2xx.
    pub async fn increment(&self, material_id: &str) -> Result<()> {
        let mut body = serde_json::Map::new();
        body.insert(
            self.rpc_argument.clone(),
            serde_json::Value::String(material_id.to_string()),
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Other(format!(
                "download counter returned {}: {}",
                status, text
            )));
        }

        tracing::debug!(material_id = %material_id, "download count incremented");
        Ok(())
    }
}

#[async_trait]
impl PostDownloadNotifier for RestDownloadCounter {
    async fn on_downloaded(&self, download: &CompletedDownload) -> Result<()> {
        match download.material_id.as_deref() {
            Some(material_id) => self.increment(material_id).await,
            None => {
                tracing::trace!(download_id = %download.id, "no material id, counter skipped");
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "download-counter"
    }
}
