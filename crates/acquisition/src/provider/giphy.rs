//! GIPHY search API client
//!
//! Rate limit: shared per API key, enforced client-side with a token bucket
//! so that concurrent query pipelines draw from one budget.

use super::{SearchPage, SearchProvider};
use crate::config::ProviderConfig;
use crate::{AcquisitionError, Result};
use async_trait::async_trait;
use gifguess_core::telemetry::external_api_span;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, Instrument};

/// Longest provider error body kept in an error message
const MAX_ERROR_BODY: usize = 200;

/// GIPHY API client for GIF search
pub struct GiphyClient {
    client: Client,
    api_key: String,
    base_url: String,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl GiphyClient {
    /// Create a new GIPHY client
    ///
    /// # Arguments
    /// * `api_key` - GIPHY API key
    /// * `requests_per_second` - Outbound request budget (0 is treated as 1)
    /// * `timeout` - Per-request timeout
    pub fn new(api_key: String, requests_per_second: u32, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            api_key,
            base_url: "https://api.giphy.com/v1/gifs".to_string(),
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        })
    }

    /// Create a client from provider configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Ok(Self::new(
            config.api_key.clone(),
            config.requests_per_second,
            Duration::from_millis(config.request_timeout_ms),
        )?
        .with_base_url(config.api_url.clone()))
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn search_url(&self, query: &str, limit: u32, offset: u64, rating: &str) -> String {
        format!(
            "{}/search?api_key={}&q={}&limit={}&offset={}&rating={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query),
            limit,
            offset,
            urlencoding::encode(rating)
        )
    }
}

#[async_trait]
impl SearchProvider for GiphyClient {
    fn provider_id(&self) -> &'static str {
        "giphy"
    }

    async fn search_page(
        &self,
        query: &str,
        limit: u32,
        offset: u64,
        rating: &str,
    ) -> Result<SearchPage> {
        self.limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let url = self.search_url(query, limit, offset, rating);
        let span = external_api_span("GET", &format!("{}/search", self.base_url), "giphy");

        async move {
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                let message: String = body.chars().take(MAX_ERROR_BODY).collect();
                return Err(AcquisitionError::Provider {
                    status: status.as_u16(),
                    message,
                });
            }

            let page: SearchPage = serde_json::from_str(&body)
                .map_err(|e| AcquisitionError::MalformedResponse(e.to_string()))?;

            debug!(
                query = %query,
                offset = offset,
                returned = page.data.len(),
                total_count = page.pagination.total_count,
                "Fetched provider page"
            );

            Ok(page)
        }
        .instrument(span)
        .await
    }
}
