//! Media search provider clients

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub mod giphy;

pub use giphy::GiphyClient;

/// One page of provider search results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub data: Vec<RawMediaResult>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl SearchPage {
    /// Whether a page starting after this one could still hold results
    pub fn has_more(&self, requested_offset: u64, page_size: u32) -> bool {
        if self.data.is_empty() {
            return false;
        }
        let next_offset = requested_offset + self.data.len() as u64;
        if self.pagination.total_count > 0 && next_offset >= self.pagination.total_count {
            return false;
        }
        self.data.len() as u64 >= u64::from(page_size)
    }
}

/// Pagination block reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub offset: u64,
}

/// Raw search result as returned by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMediaResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
    /// Provider page for the media
    #[serde(default)]
    pub url: Option<String>,
    /// Original source of the media, if the uploader supplied one
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub import_datetime: Option<String>,
    #[serde(default)]
    pub images: HashMap<String, RawRendition>,
}

/// Raw rendition; numeric fields may arrive as numbers or numeric strings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRendition {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub width: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: u32,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: f64,
}

/// Search provider contract
///
/// One call fetches one page; retries and paging policy belong to the caller.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider identifier used in logs
    fn provider_id(&self) -> &'static str;

    /// Fetch one page of results
    ///
    /// # Arguments
    /// * `query` - Search term
    /// * `limit` - Page size
    /// * `offset` - Index of the first result
    /// * `rating` - Content-safety rating
    async fn search_page(
        &self,
        query: &str,
        limit: u32,
        offset: u64,
        rating: &str,
    ) -> Result<SearchPage>;
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value).filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0))
}

fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or(0))
}

fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_u64(deserializer)?;
    Ok(u32::try_from(value).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_rendition_accepts_string_numbers() {
        let raw: RawRendition = serde_json::from_value(serde_json::json!({
            "url": "https://media.giphy.com/media/abc/200w.gif",
            "width": "200",
            "height": 113,
            "size": "48213",
            "duration": null
        }))
        .unwrap();

        assert_eq!(raw.width, 200);
        assert_eq!(raw.height, 113);
        assert_eq!(raw.size, 48213);
        assert_eq!(raw.duration, 0.0);
    }

    #[test]
    fn test_raw_rendition_garbage_numbers_become_zero() {
        let raw: RawRendition = serde_json::from_value(serde_json::json!({
            "width": "wide",
            "height": -4
        }))
        .unwrap();

        assert_eq!(raw.width, 0);
        assert_eq!(raw.height, 0);
        assert!(raw.url.is_none());
    }

    #[test]
    fn test_search_page_missing_fields() {
        let page: SearchPage = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total_count, 0);
    }

    #[test]
    fn test_has_more() {
        let page = SearchPage {
            data: vec![RawMediaResult::default(); 50],
            pagination: Pagination {
                total_count: 120,
                count: 50,
                offset: 0,
            },
        };
        assert!(page.has_more(0, 50));
        assert!(!page.has_more(100, 50));

        let short = SearchPage {
            data: vec![RawMediaResult::default(); 10],
            pagination: Pagination::default(),
        };
        assert!(!short.has_more(0, 50));
        assert!(!SearchPage::default().has_more(0, 50));
    }
}
