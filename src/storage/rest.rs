//! REST client for the backend's storage API

use super::ObjectStorage;
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

#[derive(Deserialize)]
struct StorageErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Storage client speaking `POST /storage/v1/object/sign/{bucket}/{path}`
///
/// Requests carry the project's API key in the `apikey` header and the session
/// token (or the API key) as bearer token. The relative `signedURL` in the
/// response is joined onto `{base_url}/storage/v1`.
pub struct RestObjectStorage {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bearer: String,
}

impl RestObjectStorage {
    /// Create a client from storage settings
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            bearer: config.bearer_token().to_string(),
        })
    }

    fn storage_root(&self) -> String {
        format!("{}/storage/v1", self.base_url)
    }

    fn sign_endpoint(&self, bucket: &str, path: &str) -> String {
        let encoded_path = path
            .trim_start_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/object/sign/{}/{}",
            self.storage_root(),
            urlencoding::encode(bucket),
            encoded_path
        )
    }

    fn absolute_signed_url(&self, signed: &str) -> String {
        if crate::utils::is_absolute_url(signed) {
            signed.to_string()
        } else if signed.starts_with('/') {
            format!("{}{}", self.storage_root(), signed)
        } else {
            format!("{}/{}", self.storage_root(), signed)
        }
    }
}

#[async_trait]
impl ObjectStorage for RestObjectStorage {
    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expiry: Duration,
    ) -> Result<String> {
        let endpoint = self.sign_endpoint(bucket, path);
        let response = self
            .client
            .post(&endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
            .json(&SignRequest {
                expires_in: expiry.as_secs(),
            })
            .send()
            .await
            .map_err(|e| {
                let msg = if e.is_timeout() {
                    format!("timed out requesting signed URL for '{}'", path)
                } else if e.is_connect() {
                    format!("connection failed for storage endpoint: {}", e)
                } else {
                    format!("signed URL request failed: {}", e)
                };
                Error::SourceResolutionFailed(msg)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<StorageErrorBody>(&body)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or(body);
            tracing::warn!(
                bucket = %bucket,
                path = %path,
                status = status.as_u16(),
                error = %detail,
                "storage refused to sign URL"
            );
            return Err(Error::SourceResolutionFailed(format!(
                "storage returned {}: {}",
                status, detail
            )));
        }

        let signed: SignResponse = response.json().await.map_err(|e| {
            Error::SourceResolutionFailed(format!("malformed sign response: {}", e))
        })?;

        Ok(self.absolute_signed_url(&signed.signed_url))
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
