//! Outbound surface of the acquisition pipeline

use crate::batch::{BatchOrchestrator, BatchSettings};
use crate::cache::{AcquisitionCache, CacheStore, MemoryCacheStore, RedisCacheStore};
use crate::config::{AcquisitionConfig, CacheConfig};
use crate::model::MediaItem;
use crate::pipeline::{PipelineSettings, QueryPipeline};
use crate::provider::{GiphyClient, SearchProvider};
use crate::similarity::SimilarityDetector;
use crate::uploader::{HttpMediaHost, MediaHost, RehostUploader};
use crate::Result;
use gifguess_core::RedisConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// GIF acquisition service
///
/// Every returned item carries a first-party `hosted_url`. Callers must
/// tolerate fewer items than requested; an empty list means no results.
pub struct GifAcquisition {
    pipeline: Arc<QueryPipeline>,
    orchestrator: BatchOrchestrator,
}

impl GifAcquisition {
    /// Assemble a service from explicit adapters
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        host: Arc<dyn MediaHost>,
        cache_store: Arc<dyn CacheStore>,
        config: &AcquisitionConfig,
    ) -> Result<Self> {
        let uploader = Arc::new(RehostUploader::from_config(host, &config.upload)?);
        let cache = AcquisitionCache::new(
            cache_store,
            config.cache.result_ttl_sec,
            config.cache.item_ttl_sec,
        );

        let pipeline = Arc::new(QueryPipeline::new(
            provider,
            uploader,
            SimilarityDetector::new(&config.dedup),
            cache,
            PipelineSettings::from_config(config),
        ));
        let orchestrator =
            BatchOrchestrator::new(Arc::clone(&pipeline), BatchSettings::from_config(config));

        Ok(Self {
            pipeline,
            orchestrator,
        })
    }

    /// Wire the GIPHY client and the HTTP media host from configuration
    pub fn from_config(config: &AcquisitionConfig, cache_store: Arc<dyn CacheStore>) -> Result<Self> {
        config.validate()?;
        let provider = Arc::new(GiphyClient::from_config(&config.provider)?);
        let host = Arc::new(HttpMediaHost::from_config(&config.upload)?);
        Self::new(provider, host, cache_store, config)
    }

    /// Items for one query
    pub async fn search_one(&self, query: &str, limit: usize) -> Vec<MediaItem> {
        self.pipeline.search(query, limit).await
    }

    /// Items for many queries, keyed by normalized query, within the batch deadline
    pub async fn search_many(
        &self,
        queries: &[String],
        limit: usize,
    ) -> HashMap<String, Vec<MediaItem>> {
        self.orchestrator.search_many(queries, limit).await
    }
}

/// Cache store for `config`: Redis when reachable, otherwise an in-process store
///
/// `redis` takes precedence over `config.redis_url`, which is only used
/// with default timeouts.
pub async fn cache_store_from_config(
    config: &CacheConfig,
    redis: Option<RedisConfig>,
) -> Arc<dyn CacheStore> {
    if let Some(redis_config) = redis.or_else(|| config.redis_config()) {
        match RedisCacheStore::connect(&redis_config).await {
            Ok(store) => {
                info!("Using Redis result cache");
                return Arc::new(store);
            }
            Err(e) => warn!(error = %e, "Redis unavailable; using in-process cache"),
        }
    }

    Arc::new(MemoryCacheStore::new(config.max_capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_store_without_redis_url() {
        let store = cache_store_from_config(&CacheConfig::default(), None).await;
        store.set("k", "v", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_within_timeout() {
        let redis = RedisConfig {
            url: "redis://127.0.0.1:1/0".to_string(),
            connection_timeout: Duration::from_millis(300),
            response_timeout: Duration::from_millis(300),
        };

        let started = std::time::Instant::now();
        let store = cache_store_from_config(&CacheConfig::default(), Some(redis)).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        store.set("k", "v", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let mut config = AcquisitionConfig::default();
        config.provider.max_pages = 0;
        let result = GifAcquisition::from_config(&config, Arc::new(MemoryCacheStore::default()));
        assert!(result.is_err());
    }
}
