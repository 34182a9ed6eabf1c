//! Result and item cache
//!
//! Two kinds of entries share one key-value store:
//! - `gifs:query:<sha256>`: the accepted items for a normalized query
//! - `gifs:item:<media id>`: the hosted URL of one re-hosted item
//!
//! Every operation is a single-key get or set. Failures are logged and
//! treated as a miss (reads) or skipped (writes) by [`AcquisitionCache`].

use crate::model::{CachedResultSet, MediaItem};
use crate::pipeline::normalize_query;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gifguess_core::telemetry::cache_op_span;
use gifguess_core::{ConfigLoader, RedisConfig};
use moka::future::Cache;
use moka::Expiry;
use redis::{aio::ConnectionManager, Client};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn, Instrument};

const PREFIX_QUERY: &str = "gifs:query";
const PREFIX_ITEM: &str = "gifs:item";

/// Longest accepted entry lifetime: one year
pub const MAX_TTL_SEC: u64 = 365 * 24 * 3600;

/// Error types for cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache operation failed: {0}")]
    Operation(String),
}

/// Key-value store with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl_sec: u64) -> Result<(), CacheError>;
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisCacheStore {
    manager: ConnectionManager,
    response_timeout: Duration,
}

impl RedisCacheStore {
    /// Connect and verify the server answers `PING`
    #[instrument(skip(config), fields(redis_url = %config.url))]
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        config
            .validate()
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        info!("Connecting result cache to Redis");

        let client = Client::open(config.url.as_str())?;
        let manager = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| CacheError::Operation("timed out connecting to Redis".to_string()))??;

        let mut conn = manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;

        Ok(Self {
            manager,
            response_timeout: config.response_timeout,
        })
    }

    /// Connect to `url` with default timeouts
    pub async fn new(url: &str) -> Result<Self, CacheError> {
        let config = RedisConfig {
            url: url.to_string(),
            ..RedisConfig::default()
        };
        Self::connect(&config).await
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        key: &str,
        fut: impl std::future::Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.response_timeout, fut.instrument(cache_op_span(operation, key)))
            .await
            .map_err(|_| CacheError::Operation(format!("Redis {} timed out", operation)))?
            .map_err(CacheError::Connection)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.bounded("get", key, cmd.query_async::<_, Option<String>>(&mut conn))
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl_sec: u64) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl_sec.max(1));
        self.bounded("set", key, cmd.query_async::<_, ()>(&mut conn))
            .await
    }
}

#[derive(Clone)]
struct MemoryEntry {
    value: String,
    ttl: Duration,
}

/// Per-entry time-to-live for [`MemoryCacheStore`]
struct EntryTtl;

impl Expiry<String, MemoryEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &MemoryEntry,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    // Overwrites restart the clock with the new entry's ttl
    fn expire_after_update(
        &self,
        _key: &String,
        entry: &MemoryEntry,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process store for single-node runs and tests
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: Cache<String, MemoryEntry>,
}

impl MemoryCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(EntryTtl)
                .build(),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl_sec: u64) -> Result<(), CacheError> {
        let entry = MemoryEntry {
            value: value.to_string(),
            ttl: Duration::from_secs(ttl_sec.clamp(1, MAX_TTL_SEC)),
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }
}

/// Typed view over a [`CacheStore`]
#[derive(Clone)]
pub struct AcquisitionCache {
    store: Arc<dyn CacheStore>,
    result_ttl_sec: u64,
    item_ttl_sec: u64,
}

impl AcquisitionCache {
    pub fn new(store: Arc<dyn CacheStore>, result_ttl_sec: u64, item_ttl_sec: u64) -> Self {
        Self {
            store,
            result_ttl_sec,
            item_ttl_sec,
        }
    }

    /// Cache key for a query; the query is normalized first
    pub fn result_key(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalize_query(query).as_bytes());
        format!("{}:{}", PREFIX_QUERY, hex::encode(hasher.finalize()))
    }

    pub fn item_key(media_id: &str) -> String {
        format!("{}:{}", PREFIX_ITEM, media_id)
    }

    /// Cached result set for `query`, if present and unexpired
    ///
    /// Items without a hosted URL are dropped on read.
    #[instrument(skip(self), fields(cache_type = "query"))]
    pub async fn result_set(&self, query: &str) -> Option<CachedResultSet> {
        let key = Self::result_key(query);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "Result cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Result cache read failed");
                return None;
            }
        };

        let mut set: CachedResultSet = match serde_json::from_str(&raw) {
            Ok(set) => set,
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable result cache entry");
                return None;
            }
        };

        if set.is_expired() {
            debug!(key = %key, "Result cache entry expired");
            return None;
        }

        set.items.retain(MediaItem::is_hosted);
        debug!(key = %key, items = set.items.len(), "Result cache hit");
        Some(set)
    }

    /// Store the accepted items for `query`
    #[instrument(skip(self, items), fields(cache_type = "query", items = items.len()))]
    pub async fn store_result_set(&self, query: &str, items: &[MediaItem]) {
        let key = Self::result_key(query);
        let Some(expires_at) = expiry_from_now(self.result_ttl_sec) else {
            warn!(key = %key, ttl_sec = self.result_ttl_sec, "Result TTL out of range; skipping write");
            return;
        };
        let set = CachedResultSet {
            query: normalize_query(query),
            items: items.to_vec(),
            expires_at,
        };

        let outcome = match serde_json::to_string(&set) {
            Ok(json) => self.store.set(&key, &json, self.result_ttl_sec).await,
            Err(e) => Err(CacheError::Serialization(e)),
        };
        match outcome {
            Ok(()) => debug!(key = %key, "Cached result set"),
            Err(e) => warn!(key = %key, error = %e, "Result cache write failed"),
        }
    }

    /// Hosted URL previously recorded for `media_id`
    pub async fn hosted_url(&self, media_id: &str) -> Option<String> {
        if media_id.is_empty() {
            return None;
        }
        let key = Self::item_key(media_id);
        match self.store.get(&key).await {
            Ok(value) => value.filter(|url| !url.is_empty()),
            Err(e) => {
                warn!(key = %key, error = %e, "Item cache read failed");
                None
            }
        }
    }

    /// Record the hosted URL for `media_id`
    pub async fn store_hosted_url(&self, media_id: &str, hosted_url: &str) {
        if media_id.is_empty() || hosted_url.is_empty() {
            return;
        }
        let key = Self::item_key(media_id);
        if let Err(e) = self.store.set(&key, hosted_url, self.item_ttl_sec).await {
            warn!(key = %key, error = %e, "Item cache write failed");
        }
    }
}

/// `now + ttl_sec`, or `None` when the ttl is zero or past [`MAX_TTL_SEC`]
fn expiry_from_now(ttl_sec: u64) -> Option<DateTime<Utc>> {
    if ttl_sec == 0 || ttl_sec > MAX_TTL_SEC {
        return None;
    }
    let ttl = chrono::Duration::try_seconds(i64::try_from(ttl_sec).ok()?)?;
    Utc::now().checked_add_signed(ttl)
}
