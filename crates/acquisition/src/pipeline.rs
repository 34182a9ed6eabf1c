//! Single-query acquisition pipeline
//!
//! One run walks provider pages in order and re-hosts candidates one at a
//! time. Uploads are strictly sequential within a run: the re-hosting
//! service rate-limits per caller, not per query.
//!
//! A run ends when enough items are accepted, the provider runs dry or
//! errors, the page budget is spent, or the upload breaker trips.

use crate::cache::AcquisitionCache;
use crate::config::AcquisitionConfig;
use crate::model::{CachedResultSet, MediaItem};
use crate::normalizer::normalize;
use crate::provider::SearchProvider;
use crate::similarity::{ItemDigest, SimilarityDetector};
use crate::uploader::RehostUploader;
use crate::Result;
use gifguess_core::{BackoffPolicy, FailureBreaker};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Normalize a query for cache keys and dedup: trimmed, lower-cased,
/// inner whitespace collapsed
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Paging and pacing knobs of one run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub page_size: u32,
    pub max_pages: u32,
    pub rating: String,
    /// Pause after an accepted item while more are needed
    pub inter_item_delay: Duration,
    pub backoff: BackoffPolicy,
    /// Consecutive upload failures that end the run
    pub failure_threshold: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AcquisitionConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self {
            page_size: config.provider.page_size,
            max_pages: config.provider.max_pages,
            rating: config.provider.rating.clone(),
            inter_item_delay: Duration::from_millis(config.pipeline.inter_item_delay_ms),
            backoff: BackoffPolicy::from_millis(
                config.pipeline.backoff_base_ms,
                config.pipeline.backoff_cap_ms,
            ),
            failure_threshold: config.pipeline.failure_threshold,
        }
    }
}

/// Search → normalize → re-host → dedup → cache, for one query
pub struct QueryPipeline {
    provider: Arc<dyn SearchProvider>,
    uploader: Arc<RehostUploader>,
    detector: SimilarityDetector,
    cache: AcquisitionCache,
    settings: PipelineSettings,
}

/// Mutable state of one run
struct RunState {
    seen: HashSet<String>,
    accepted: Vec<MediaItem>,
    digests: Vec<ItemDigest>,
    breaker: FailureBreaker,
}

impl QueryPipeline {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        uploader: Arc<RehostUploader>,
        detector: SimilarityDetector,
        cache: AcquisitionCache,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            uploader,
            detector,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &AcquisitionCache {
        &self.cache
    }

    /// Cached result set for `query` with only first-party items kept
    pub async fn cached_set(&self, query: &str) -> Option<CachedResultSet> {
        let mut set = self.cache.result_set(query).await?;
        set.items
            .retain(|item| self.uploader.is_first_party(&item.hosted_url));
        Some(set)
    }

    /// Cached items for `query` when the cached set covers `desired`
    pub async fn cached(&self, query: &str, desired: usize) -> Option<Vec<MediaItem>> {
        let mut set = self.cached_set(query).await?;
        if !set.satisfies(desired) {
            debug!(query = %query, cached = set.items.len(), desired, "Cached set too small");
            return None;
        }
        set.items.truncate(desired);
        Some(set.items)
    }

    /// Return up to `desired` hosted, mutually distinct items for `query`
    ///
    /// Never fails: provider, upload, and cache errors shorten the result.
    #[instrument(skip(self), fields(provider = self.provider.provider_id()))]
    pub async fn search(&self, query: &str, desired: usize) -> Vec<MediaItem> {
        let normalized = normalize_query(query);
        if normalized.is_empty() || desired == 0 {
            return Vec::new();
        }

        if let Some(items) = self.cached(&normalized, desired).await {
            debug!(query = %normalized, count = items.len(), "Served from cache");
            return items;
        }

        let mut accepted = self.acquire(&normalized, desired).await;

        if !accepted.is_empty() {
            self.cache.store_result_set(&normalized, &accepted).await;
        }

        accepted.truncate(desired);
        info!(query = %normalized, desired, accepted = accepted.len(), "Query run finished");
        accepted
    }

    async fn acquire(&self, query: &str, desired: usize) -> Vec<MediaItem> {
        let mut state = RunState {
            seen: HashSet::new(),
            accepted: Vec::with_capacity(desired),
            digests: Vec::with_capacity(desired),
            breaker: FailureBreaker::new(
                format!("upload:{}", query),
                self.settings.failure_threshold,
            ),
        };

        let page_size = self.settings.page_size;
        let mut offset = 0u64;

        'pages: for page_number in 0..self.settings.max_pages {
            let page = match self
                .provider
                .search_page(query, page_size, offset, &self.settings.rating)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(query = %query, offset, error = %e, "Provider page failed; ending run");
                    break;
                }
            };

            if page.data.is_empty() {
                debug!(query = %query, page_number, "Provider returned an empty page");
                break;
            }
            let has_more = page.has_more(offset, page_size);

            for raw in &page.data {
                if state.accepted.len() >= desired {
                    break 'pages;
                }

                let id = raw.id.trim();
                if !id.is_empty() && !state.seen.insert(id.to_string()) {
                    continue;
                }

                let item = normalize(raw, query);
                if !self.consider(item, desired, &mut state).await {
                    break 'pages;
                }
            }

            if !has_more || state.accepted.len() >= desired {
                break;
            }
            offset += u64::from(page_size);
        }

        state.accepted
    }

    /// Upload and dedup one candidate; `false` once the breaker has tripped
    async fn consider(&self, mut item: MediaItem, desired: usize, state: &mut RunState) -> bool {
        match self.host(&item).await {
            Ok(hosted_url) => {
                state.breaker.record_success();
                item.hosted_url = hosted_url;

                let digest = self.detector.digest(&item);
                if self.detector.is_duplicate(&digest, &state.digests) {
                    debug!(id = %item.id, "Dropping near-duplicate");
                    return true;
                }

                state.digests.push(digest);
                state.accepted.push(item);

                if state.accepted.len() < desired && !self.settings.inter_item_delay.is_zero() {
                    tokio::time::sleep(self.settings.inter_item_delay).await;
                }
                true
            }
            Err(e) if !e.is_upload_failure() => {
                warn!(id = %item.id, error = %e, "Skipping candidate");
                true
            }
            Err(e) => {
                state.breaker.record_failure();
                let failures = state.breaker.consecutive_failures();
                warn!(id = %item.id, failures, error = %e, "Upload failed");

                self.settings.backoff.sleep(failures).await;
                if state.breaker.is_tripped() {
                    warn!(
                        breaker = state.breaker.name(),
                        accepted = state.accepted.len(),
                        "Upload breaker tripped; ending run"
                    );
                    return false;
                }
                true
            }
        }
    }

    /// Hosted URL for `item`: the item cache when it holds a first-party URL,
    /// otherwise a fresh upload
    async fn host(&self, item: &MediaItem) -> Result<String> {
        if let Some(url) = self.cache.hosted_url(&item.id).await {
            if self.uploader.is_first_party(&url) {
                debug!(id = %item.id, "Hosted URL served from item cache");
                return Ok(url);
            }
        }

        let hosted = self.uploader.upload(item.upload_source()).await?;
        self.cache.store_hosted_url(&item.id, &hosted).await;
        Ok(hosted)
    }
}
