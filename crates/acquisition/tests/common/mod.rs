//! In-process stand-ins for the search provider and the media host

#![allow(dead_code)]

use async_trait::async_trait;
use gifguess_acquisition::{
    AcquisitionConfig, AcquisitionError, CacheError, CacheStore, GifAcquisition, MediaHost,
    MemoryCacheStore, Pagination, RawMediaResult, RawRendition, SearchPage, SearchProvider,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const FIRST_PARTY_PATTERN: &str = r"^https://i\.redd\.it/[A-Za-z0-9_-]+\.(gif|mp4|webp)$";

/// Raw result with one compact rendition at `width`x`height`
pub fn raw(id: &str, description: &str, width: u32, height: u32) -> RawMediaResult {
    let mut images = HashMap::new();
    images.insert(
        "fixed_width".to_string(),
        RawRendition {
            url: Some(format!("https://media.giphy.com/media/{}/200w.gif", id)),
            width,
            height,
            size: 10_000,
            duration: 1.5,
        },
    );
    images.insert(
        "original".to_string(),
        RawRendition {
            url: Some(format!("https://media.giphy.com/media/{}/giphy.gif", id)),
            width: width * 2,
            height: height * 2,
            size: 40_000,
            duration: 1.5,
        },
    );

    RawMediaResult {
        id: id.to_string(),
        title: Some(format!("{} GIF", id)),
        alt_text: Some(description.to_string()),
        url: Some(format!("https://giphy.com/gifs/{}", id)),
        source: None,
        import_datetime: Some("2020-01-01 00:00:00".to_string()),
        images,
    }
}

/// `count` mutually distinct results whose ids start with `prefix`
pub fn distinct_results(prefix: &str, count: usize) -> Vec<RawMediaResult> {
    (0..count)
        .map(|i| {
            raw(
                &format!("{}{}", prefix, i),
                &format!("unique{} caption{} words{}", i, i, i),
                100 + (i as u32) * 40,
                100,
            )
        })
        .collect()
}

/// Provider serving a fixed result list per query
#[derive(Default)]
pub struct StubProvider {
    results: HashMap<String, Vec<RawMediaResult>>,
    delays: HashMap<String, Duration>,
    fail_from_offset: Mutex<Option<u64>>,
    calls: Mutex<Vec<(String, u64, Instant)>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, results: Vec<RawMediaResult>) -> Self {
        self.results.insert(query.to_string(), results);
        self
    }

    /// Delay every page request for `query`
    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    /// Fail every page request at or past `offset`
    pub fn failing_from(self, offset: u64) -> Self {
        *self.fail_from_offset.lock().unwrap() = Some(offset);
        self
    }

    pub fn calls(&self) -> Vec<(String, u64, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, query: &str) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter(|(q, _, _)| q == query)
            .map(|(_, offset, _)| offset)
            .collect()
    }

    pub fn first_call_at(&self, query: &str) -> Option<Instant> {
        self.calls()
            .into_iter()
            .find(|(q, _, _)| q == query)
            .map(|(_, _, at)| at)
    }
}

#[async_trait]
impl SearchProvider for StubProvider {
    fn provider_id(&self) -> &'static str {
        "stub"
    }

    async fn search_page(
        &self,
        query: &str,
        limit: u32,
        offset: u64,
        _rating: &str,
    ) -> gifguess_acquisition::Result<SearchPage> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), offset, Instant::now()));

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }

        let fail_from = *self.fail_from_offset.lock().unwrap();
        if fail_from.is_some_and(|from| offset >= from) {
            return Err(AcquisitionError::Provider {
                status: 500,
                message: "stub failure".to_string(),
            });
        }

        let all = self.results.get(query).cloned().unwrap_or_default();
        let data: Vec<RawMediaResult> = all
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(SearchPage {
            pagination: Pagination {
                total_count: all.len() as u64,
                count: data.len() as u64,
                offset,
            },
            data,
        })
    }
}

/// Scripted outcome of one upload call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Returns a first-party URL derived from the source
    Hosted,
    /// Returns the third-party source URL unchanged
    Echo,
    /// Fails outright
    Fail,
    /// Never answers within any reasonable timeout
    Hang,
    /// Fails for a reason unrelated to the upload itself
    Misconfigured,
}

/// Media host replaying scripted outcomes, then a default
pub struct StubHost {
    script: Mutex<VecDeque<Outcome>>,
    default: Outcome,
    uploads: Mutex<Vec<String>>,
}

impl StubHost {
    pub fn new(default: Outcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn scripted(outcomes: &[Outcome], default: Outcome) -> Self {
        let host = Self::new(default);
        host.script.lock().unwrap().extend(outcomes.iter().copied());
        host
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

/// `https://media.giphy.com/media/<id>/200w.gif` -> `https://i.redd.it/<id>.gif`
pub fn hosted_url_for(source_url: &str) -> String {
    let id = source_url
        .split('/')
        .skip_while(|s| *s != "media")
        .nth(1)
        .unwrap_or("unknown");
    format!("https://i.redd.it/{}.gif", id)
}

#[async_trait]
impl MediaHost for StubHost {
    async fn upload(
        &self,
        source_url: &str,
        _media_type: &str,
    ) -> gifguess_acquisition::Result<String> {
        self.uploads.lock().unwrap().push(source_url.to_string());
        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(self.default);

        match outcome {
            Outcome::Hosted => Ok(hosted_url_for(source_url)),
            Outcome::Echo => Ok(source_url.to_string()),
            Outcome::Fail => Err(AcquisitionError::Upload("stub host refused".to_string())),
            Outcome::Misconfigured => Err(AcquisitionError::Config(
                "stub host has no credentials".to_string(),
            )),
            Outcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(hosted_url_for(source_url))
            }
        }
    }
}

/// Default configuration with a small page size
pub fn test_config(page_size: u32) -> AcquisitionConfig {
    let mut config = AcquisitionConfig::default();
    config.provider.page_size = page_size;
    config
}

/// Store whose every read and write fails
pub struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Operation("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_sec: u64) -> Result<(), CacheError> {
        Err(CacheError::Operation("connection refused".to_string()))
    }
}

/// In-process store whose reads take `delay`
pub struct SlowStore {
    inner: MemoryCacheStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryCacheStore::default(),
            delay,
        }
    }
}

#[async_trait]
impl CacheStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl_sec: u64) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl_sec).await
    }
}

pub fn service(
    provider: Arc<StubProvider>,
    host: Arc<StubHost>,
    store: Arc<dyn CacheStore>,
    config: &AcquisitionConfig,
) -> GifAcquisition {
    GifAcquisition::new(provider, host, store, config).unwrap()
}
