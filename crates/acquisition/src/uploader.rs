//! Re-hosting of provider media onto first-party infrastructure

use crate::config::UploadConfig;
use crate::{AcquisitionError, Result};
use async_trait::async_trait;
use gifguess_core::telemetry::external_api_span;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn, Instrument};

/// Re-hosting service
///
/// One call is one attempt; retries belong to the pipeline.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload `source_url` and return the hosted URL
    async fn upload(&self, source_url: &str, media_type: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    url: &'a str,
    #[serde(rename = "type")]
    media_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default)]
    media_url: String,
}

/// HTTP re-hosting client: `POST {endpoint}` with `{url, type}`, answers `{mediaUrl}`
pub struct HttpMediaHost {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpMediaHost {
    pub fn new(endpoint: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: endpoint.into(),
            auth_token,
        })
    }

    pub fn from_config(config: &UploadConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.auth_token.clone())
    }
}

#[async_trait]
impl MediaHost for HttpMediaHost {
    async fn upload(&self, source_url: &str, media_type: &str) -> Result<String> {
        let span = external_api_span("POST", &self.endpoint, "media-host");

        async move {
            let mut request = self.client.post(&self.endpoint).json(&UploadRequest {
                url: source_url,
                media_type,
            });
            if let Some(token) = &self.auth_token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AcquisitionError::Upload(format!("media host unreachable: {}", e)))?;
            let status = response.status();
            if !status.is_success() {
                return Err(AcquisitionError::Upload(format!(
                    "media host returned {}",
                    status.as_u16()
                )));
            }

            let body: UploadResponse = response.json().await.map_err(|e| {
                AcquisitionError::Upload(format!("unreadable media host response: {}", e))
            })?;
            Ok(body.media_url)
        }
        .instrument(span)
        .await
    }
}

/// Single-attempt uploader with a timeout and first-party validation
///
/// A hosted URL is trusted at face value once it matches the first-party
/// pattern; it is not fetched again.
pub struct RehostUploader {
    host: Arc<dyn MediaHost>,
    timeout: Duration,
    first_party: Regex,
    media_type: String,
}

impl RehostUploader {
    /// Create an uploader
    ///
    /// # Arguments
    /// * `host` - Re-hosting service
    /// * `timeout` - Budget for one upload call
    /// * `first_party_pattern` - Pattern every accepted hosted URL must match
    /// * `media_type` - Media type passed to the host
    pub fn new(
        host: Arc<dyn MediaHost>,
        timeout: Duration,
        first_party_pattern: &str,
        media_type: impl Into<String>,
    ) -> Result<Self> {
        let first_party = Regex::new(first_party_pattern).map_err(|e| {
            AcquisitionError::Config(format!("invalid first-party pattern: {}", e))
        })?;

        Ok(Self {
            host,
            timeout,
            first_party,
            media_type: media_type.into(),
        })
    }

    pub fn from_config(host: Arc<dyn MediaHost>, config: &UploadConfig) -> Result<Self> {
        Self::new(
            host,
            Duration::from_millis(config.timeout_ms),
            &config.first_party_pattern,
            config.media_type.clone(),
        )
    }

    /// Whether `url` points at first-party media infrastructure
    pub fn is_first_party(&self, url: &str) -> bool {
        !url.is_empty() && self.first_party.is_match(url)
    }

    /// Re-host `source_url`, racing the call against the upload timeout
    pub async fn upload(&self, source_url: &str) -> Result<String> {
        if source_url.trim().is_empty() {
            return Err(AcquisitionError::UploadRejected {
                url: source_url.to_string(),
            });
        }

        let hosted = match tokio::time::timeout(
            self.timeout,
            self.host.upload(source_url, &self.media_type),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(source_url = %source_url, timeout_ms = self.timeout.as_millis() as u64, "Upload timed out");
                return Err(AcquisitionError::UploadTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        if !self.is_first_party(&hosted) {
            warn!(source_url = %source_url, hosted_url = %hosted, "Upload did not land on first-party host");
            return Err(AcquisitionError::UploadRejected { url: hosted });
        }

        debug!(source_url = %source_url, hosted_url = %hosted, "Uploaded media");
        Ok(hosted)
    }
}
