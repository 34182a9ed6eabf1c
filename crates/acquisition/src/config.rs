//! Acquisition pipeline configuration
//!
//! Every tuning constant of the pipeline lives here. The dedup thresholds,
//! breaker threshold, and delays are empirical starting points meant to be
//! tuned per deployment.

use crate::cache::MAX_TTL_SEC;
use crate::{AcquisitionError, Result};
use gifguess_core::{ConfigLoader, RedisConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Acquisition pipeline configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Search provider configuration
    pub provider: ProviderConfig,

    /// Re-hosting service configuration
    pub upload: UploadConfig,

    /// Single-query pipeline pacing
    pub pipeline: PipelineConfig,

    /// Near-duplicate detection thresholds
    pub dedup: DedupConfig,

    /// Batch orchestration
    pub batch: BatchConfig,

    /// Result and item cache
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the search API
    pub api_url: String,

    /// API key
    pub api_key: String,

    /// Results per page (provider maximum: 50)
    pub page_size: u32,

    /// Maximum pages fetched per query
    pub max_pages: u32,

    /// Content-safety rating sent with every request
    pub rating: String,

    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Outbound request budget shared by all queries
    pub requests_per_second: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.giphy.com/v1/gifs".to_string(),
            api_key: String::new(),
            page_size: 50,
            max_pages: 10,
            rating: "pg".to_string(),
            request_timeout_ms: 5000,
            requests_per_second: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Re-hosting endpoint
    pub endpoint: String,

    /// Bearer token for the re-hosting endpoint
    pub auth_token: Option<String>,

    /// Upload timeout in milliseconds
    pub timeout_ms: u64,

    /// Pattern every hosted URL must match
    pub first_party_pattern: String,

    /// Media type passed to the re-hosting service
    pub media_type: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8090/media/upload".to_string(),
            auth_token: None,
            timeout_ms: 2500,
            first_party_pattern: r"^https://i\.redd\.it/[A-Za-z0-9_-]+\.(gif|mp4|webp)$"
                .to_string(),
            media_type: "gif".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause after each accepted item while more are needed
    pub inter_item_delay_ms: u64,

    /// Backoff added per consecutive upload failure
    pub backoff_base_ms: u64,

    /// Backoff ceiling
    pub backoff_cap_ms: u64,

    /// Consecutive upload failures that end a run
    pub failure_threshold: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_item_delay_ms: 400,
            backoff_base_ms: 500,
            backoff_cap_ms: 1500,
            failure_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Aspect ratios closer than this are considered the same shape
    pub aspect_ratio_epsilon: f64,

    /// Token overlap above this is considered the same caption
    pub token_overlap_threshold: f64,

    /// Shorter tokens are ignored
    pub min_token_len: usize,

    /// Tokens ignored when comparing captions
    pub stop_words: Vec<String>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            aspect_ratio_epsilon: 0.1,
            token_overlap_threshold: 0.6,
            min_token_len: 3,
            stop_words: [
                "the", "and", "for", "with", "gif", "this", "that", "from", "you", "your",
                "are", "was", "but", "not", "all", "has", "have",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Launch offset between consecutive pipelines
    pub stagger_ms: u64,

    /// Overall batch deadline
    pub deadline_ms: u64,

    /// Budget for the cache reads that fill in queries unfinished at the deadline
    pub fallback_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            stagger_ms: 200,
            deadline_ms: 30_000,
            fallback_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis URL; an in-process cache is used when absent
    pub redis_url: Option<String>,

    /// TTL for per-query result sets (seconds)
    pub result_ttl_sec: u64,

    /// TTL for per-item hosted URLs (seconds)
    pub item_ttl_sec: u64,

    /// Entry bound for the in-process cache
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            result_ttl_sec: 24 * 3600,
            item_ttl_sec: 24 * 3600,
            max_capacity: 10_000,
        }
    }
}

impl CacheConfig {
    /// Redis settings for `redis_url` with default timeouts
    pub fn redis_config(&self) -> Option<RedisConfig> {
        self.redis_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| RedisConfig {
                url: url.to_string(),
                ..RedisConfig::default()
            })
    }
}

impl AcquisitionConfig {
    /// Load configuration from an optional `config/acquisition` file and the
    /// environment
    ///
    /// Environment keys use the `GIF_ACQUISITION` prefix with `__` between
    /// levels, e.g. `GIF_ACQUISITION__PROVIDER__API_KEY`. `GIPHY_API_KEY` is
    /// honoured when no key is configured.
    pub fn load() -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name("config/acquisition").required(false))
            .add_source(
                ::config::Environment::with_prefix("GIF_ACQUISITION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        if config.provider.api_key.is_empty() {
            if let Ok(key) = std::env::var("GIPHY_API_KEY") {
                config.provider.api_key = key;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.provider.page_size == 0 || self.provider.page_size > 50 {
            return Err(AcquisitionError::Config(format!(
                "provider.page_size must be between 1 and 50, got {}",
                self.provider.page_size
            )));
        }
        if self.provider.max_pages == 0 {
            return Err(AcquisitionError::Config(
                "provider.max_pages must be greater than 0".to_string(),
            ));
        }
        if self.provider.request_timeout_ms == 0 || self.upload.timeout_ms == 0 {
            return Err(AcquisitionError::Config(
                "timeouts must be greater than 0".to_string(),
            ));
        }
        if self.batch.deadline_ms == 0 || self.batch.fallback_timeout_ms == 0 {
            return Err(AcquisitionError::Config(
                "batch.deadline_ms and batch.fallback_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if !(self.dedup.aspect_ratio_epsilon > 0.0 && self.dedup.aspect_ratio_epsilon <= 1.0) {
            return Err(AcquisitionError::Config(format!(
                "dedup.aspect_ratio_epsilon must be in (0, 1], got {}",
                self.dedup.aspect_ratio_epsilon
            )));
        }
        if !(self.dedup.token_overlap_threshold > 0.0 && self.dedup.token_overlap_threshold <= 1.0)
        {
            return Err(AcquisitionError::Config(format!(
                "dedup.token_overlap_threshold must be in (0, 1], got {}",
                self.dedup.token_overlap_threshold
            )));
        }
        Regex::new(&self.upload.first_party_pattern).map_err(|e| {
            AcquisitionError::Config(format!("upload.first_party_pattern is invalid: {}", e))
        })?;
        for (name, ttl) in [
            ("cache.result_ttl_sec", self.cache.result_ttl_sec),
            ("cache.item_ttl_sec", self.cache.item_ttl_sec),
        ] {
            if ttl == 0 || ttl > MAX_TTL_SEC {
                return Err(AcquisitionError::Config(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_TTL_SEC, ttl
                )));
            }
        }
        if let Some(redis) = self.cache.redis_config() {
            redis.validate()?;
        }

        Ok(())
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.provider.request_timeout_ms)
    }
}
