//! GifGuess Acquisition Pipeline
//!
//! Turns a text term into a list of GIFs hosted on first-party infrastructure:
//! paged provider search, metadata normalization, near-duplicate suppression,
//! sequential re-hosting with backoff and a circuit breaker, and result caching.
//! A batch orchestrator runs many single-query pipelines concurrently under one
//! deadline.

pub mod batch;
pub mod cache;
pub mod config;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod provider;
pub mod service;
pub mod similarity;
pub mod uploader;

// Re-export main types
pub use batch::{BatchOrchestrator, BatchSettings};
pub use cache::{AcquisitionCache, CacheError, CacheStore, MemoryCacheStore, RedisCacheStore};
pub use config::AcquisitionConfig;
pub use model::{CachedResultSet, MediaItem, Rendition, RENDITION_COMPACT, RENDITION_FULL};
pub use normalizer::normalize;
pub use pipeline::{normalize_query, PipelineSettings, QueryPipeline};
pub use provider::{GiphyClient, Pagination, RawMediaResult, RawRendition, SearchPage, SearchProvider};
pub use service::{cache_store_from_config, GifAcquisition};
pub use similarity::{ItemDigest, SimilarityDetector};
pub use uploader::{HttpMediaHost, MediaHost, RehostUploader};

/// Common error type for the acquisition pipeline
///
/// These errors stay inside the pipeline: they are logged and turned into a
/// shorter result list, never returned from `search_one` or `search_many`.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Upload timed out after {timeout_ms}ms")]
    UploadTimeout { timeout_ms: u64 },

    #[error("Upload landed off first-party host: {url}")]
    UploadRejected { url: String },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] gifguess_core::CoreError),
}

impl AcquisitionError {
    /// Whether this error counts against the upload circuit breaker
    ///
    /// Media hosts report transport failures as `Upload`, so `Http` here
    /// always means the search provider.
    pub fn is_upload_failure(&self) -> bool {
        matches!(
            self,
            AcquisitionError::UploadTimeout { .. }
                | AcquisitionError::UploadRejected { .. }
                | AcquisitionError::Upload(_)
        )
    }
}

impl From<::config::ConfigError> for AcquisitionError {
    fn from(err: ::config::ConfigError) -> Self {
        AcquisitionError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AcquisitionError>;
pub type Error = AcquisitionError;
