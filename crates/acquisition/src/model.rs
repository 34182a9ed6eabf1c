//! Media items flowing through the acquisition pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rendition name for the full-resolution variant
pub const RENDITION_FULL: &str = "full";

/// Rendition name for the small animated preview that gets re-hosted
pub const RENDITION_COMPACT: &str = "compact";

/// One encoded variant of a media item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendition {
    /// Provider URL, empty when the provider had no such rendition
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
    pub size_bytes: u64,
}

impl Rendition {
    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }

    /// Width divided by height, or 0 when either dimension is unknown
    pub fn aspect_ratio(&self) -> f64 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }
}

/// One provider search result, normalized
///
/// `hosted_url` stays empty until the item has been re-hosted. Items with an
/// empty `hosted_url` are never handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Provider-assigned identifier
    pub id: String,
    pub title: String,
    /// Alt text; falls back to the title, then to "<query> media"
    pub description: String,
    /// Renditions keyed by name ("full", "compact")
    pub renditions: BTreeMap<String, Rendition>,
    /// Page the provider attributes the media to
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hosted_url: String,
}

impl MediaItem {
    pub fn rendition(&self, name: &str) -> Option<&Rendition> {
        self.renditions.get(name)
    }

    pub fn full(&self) -> Option<&Rendition> {
        self.rendition(RENDITION_FULL)
    }

    pub fn compact(&self) -> Option<&Rendition> {
        self.rendition(RENDITION_COMPACT)
    }

    /// URL handed to the re-hosting service
    ///
    /// The compact rendition is preferred; the full rendition is used only
    /// when the provider sent no compact variant.
    pub fn upload_source(&self) -> &str {
        [self.compact(), self.full()]
            .into_iter()
            .flatten()
            .find(|r| !r.is_empty())
            .map(|r| r.url.as_str())
            .unwrap_or("")
    }

    /// Rendition used for shape comparisons: compact when it has dimensions
    pub fn reference_rendition(&self) -> Option<&Rendition> {
        match self.compact() {
            Some(compact) if compact.aspect_ratio() > 0.0 => Some(compact),
            _ => self.full().or(self.compact()),
        }
    }

    pub fn is_hosted(&self) -> bool {
        !self.hosted_url.is_empty()
    }
}

/// Per-query result set as stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResultSet {
    /// Normalized query
    pub query: String,
    pub items: Vec<MediaItem>,
    pub expires_at: DateTime<Utc>,
}

impl CachedResultSet {
    /// Whether this set can answer a request for `requested` items right now
    ///
    /// A set with fewer items than requested is treated as stale and refetched.
    pub fn satisfies(&self, requested: usize) -> bool {
        self.expires_at > Utc::now() && self.items.len() >= requested
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
