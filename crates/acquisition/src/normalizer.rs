//! Converts raw provider results into [`MediaItem`]s
//!
//! Normalization never fails: missing renditions become zero-valued
//! placeholders and missing text falls back to something displayable.

use crate::model::{MediaItem, Rendition, RENDITION_COMPACT, RENDITION_FULL};
use crate::provider::{RawMediaResult, RawRendition};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;

/// Provider renditions used for the full variant, in preference order
const FULL_SOURCES: &[&str] = &["original"];

/// Provider renditions used for the compact variant, in preference order
const COMPACT_SOURCES: &[&str] = &["fixed_width", "downsized", "fixed_height", "preview_gif"];

/// Normalize one raw provider result
///
/// # Arguments
/// * `raw` - Raw provider result
/// * `query` - Query that produced the result, used for the last-resort description
pub fn normalize(raw: &RawMediaResult, query: &str) -> MediaItem {
    let title = non_blank(raw.title.as_deref()).unwrap_or_default();

    let description = non_blank(raw.alt_text.as_deref())
        .or_else(|| non_blank(Some(title.as_str())))
        .unwrap_or_else(|| format!("{} media", query.trim()));

    let mut renditions = BTreeMap::new();
    renditions.insert(RENDITION_FULL.to_string(), pick_rendition(raw, FULL_SOURCES));
    renditions.insert(
        RENDITION_COMPACT.to_string(),
        pick_rendition(raw, COMPACT_SOURCES),
    );

    let source_url = non_blank(raw.source.as_deref())
        .or_else(|| non_blank(raw.url.as_deref()))
        .unwrap_or_default();

    MediaItem {
        id: raw.id.trim().to_string(),
        title,
        description,
        renditions,
        source_url,
        created_at: raw.import_datetime.as_deref().and_then(parse_timestamp),
        hosted_url: String::new(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn pick_rendition(raw: &RawMediaResult, sources: &[&str]) -> Rendition {
    sources
        .iter()
        .filter_map(|name| raw.images.get(*name))
        .find(|r| r.url.as_deref().is_some_and(|u| !u.trim().is_empty()))
        .map(to_rendition)
        .unwrap_or_default()
}

fn to_rendition(raw: &RawRendition) -> Rendition {
    Rendition {
        url: raw.url.as_deref().unwrap_or_default().trim().to_string(),
        width: raw.width,
        height: raw.height,
        duration_seconds: raw.duration,
        size_bytes: raw.size,
    }
}

/// Parse provider timestamps: `YYYY-MM-DD HH:MM:SS` (UTC) or RFC 3339
///
/// The all-zero placeholder some providers send is treated as absent.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() || value.starts_with("0000-00-00") {
        return None;
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
