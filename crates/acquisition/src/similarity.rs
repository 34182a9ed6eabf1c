//! Near-duplicate detection
//!
//! Two signals must agree before an item is dropped: the shape of the clip
//! (aspect ratio) and the wording of its caption (token overlap). An exact
//! identity match is enough on its own.

use crate::config::DedupConfig;
use crate::model::MediaItem;
use std::collections::HashSet;
use url::Url;

/// Comparison features of one item, computed once per pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDigest {
    pub aspect_ratio: f64,
    /// Seconds, rounded to 0.1
    pub duration: f64,
    /// Caption words from description and title together
    pub tokens: HashSet<String>,
    /// Provider id, or a key derived from the media URL when the id is empty
    pub identity_key: String,
}

/// Near-duplicate detector with configurable thresholds
#[derive(Debug, Clone)]
pub struct SimilarityDetector {
    aspect_ratio_epsilon: f64,
    overlap_threshold: f64,
    min_token_len: usize,
    stop_words: HashSet<String>,
}

impl Default for SimilarityDetector {
    fn default() -> Self {
        Self::new(&DedupConfig::default())
    }
}

impl SimilarityDetector {
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            aspect_ratio_epsilon: config.aspect_ratio_epsilon,
            overlap_threshold: config.token_overlap_threshold,
            min_token_len: config.min_token_len,
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    /// Compute the digest of one item
    pub fn digest(&self, item: &MediaItem) -> ItemDigest {
        let reference = item.reference_rendition();
        let aspect_ratio = reference.map(|r| r.aspect_ratio()).unwrap_or(0.0);
        let duration = reference
            .map(|r| (r.duration_seconds * 10.0).round() / 10.0)
            .unwrap_or(0.0);

        let mut tokens = self.tokenize(&item.description);
        tokens.extend(self.tokenize(&item.title));

        ItemDigest {
            aspect_ratio,
            duration,
            tokens,
            identity_key: identity_key(item),
        }
    }

    /// Whether `candidate` duplicates anything already accepted
    pub fn is_duplicate(&self, candidate: &ItemDigest, accepted: &[ItemDigest]) -> bool {
        if !candidate.identity_key.is_empty()
            && accepted
                .iter()
                .any(|a| a.identity_key == candidate.identity_key)
        {
            return true;
        }

        accepted.iter().any(|a| {
            (candidate.aspect_ratio - a.aspect_ratio).abs() < self.aspect_ratio_epsilon
                && token_overlap(&candidate.tokens, &a.tokens) > self.overlap_threshold
        })
    }

    fn tokenize(&self, text: &str) -> HashSet<String> {
        text.split_whitespace()
            .map(|t| {
                t.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|t| t.chars().count() >= self.min_token_len)
            .filter(|t| !self.stop_words.contains(t))
            .collect()
    }
}

/// `|A ∩ B| / max(|A|, |B|)`; 0 when both sets are empty
pub fn token_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let larger = a.len().max(b.len());
    if larger == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / larger as f64
}

fn identity_key(item: &MediaItem) -> String {
    let id = item.id.trim();
    if !id.is_empty() {
        return id.to_string();
    }

    let url = item.upload_source();
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };

    // Provider CDN paths look like /media/<id>/<variant>.gif; size variants
    // of one clip share the segment after "media".
    let mut segments = parsed.path_segments().into_iter().flatten();
    if segments.any(|s| s == "media") {
        if let Some(key) = segments.next().filter(|s| !s.is_empty()) {
            return key.to_string();
        }
    }

    format!("{}{}", parsed.host_str().unwrap_or_default(), parsed.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rendition, RENDITION_COMPACT, RENDITION_FULL};

    fn item(id: &str, description: &str, width: u32, height: u32) -> MediaItem {
        let compact = Rendition {
            url: format!("https://media.giphy.com/media/{}/200w.gif", id),
            width,
            height,
            duration_seconds: 2.34,
            size_bytes: 1000,
        };
        MediaItem {
            id: id.to_string(),
            title: String::new(),
            description: description.to_string(),
            renditions: [
                (RENDITION_FULL.to_string(), Rendition::default()),
                (RENDITION_COMPACT.to_string(), compact),
            ]
            .into_iter()
            .collect(),
            source_url: String::new(),
            created_at: None,
            hosted_url: String::new(),
        }
    }

    fn tokens(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn digest(aspect_ratio: f64, words: &[&str], key: &str) -> ItemDigest {
        ItemDigest {
            aspect_ratio,
            duration: 0.0,
            tokens: tokens(words),
            identity_key: key.to_string(),
        }
    }

    #[test]
    fn test_digest_features() {
        let detector = SimilarityDetector::default();
        let d = detector.digest(&item("a1", "The Cat is DRINKING coffee!", 200, 100));

        assert_eq!(d.aspect_ratio, 2.0);
        assert_eq!(d.duration, 2.3);
        assert_eq!(d.identity_key, "a1");
        assert_eq!(d.tokens, tokens(&["cat", "drinking", "coffee"]));
    }

    #[test]
    fn test_title_used_when_description_blank() {
        let detector = SimilarityDetector::default();
        let mut media = item("a1", " ", 100, 100);
        media.title = "Morning Espresso".to_string();

        let d = detector.digest(&media);
        assert_eq!(d.tokens, tokens(&["morning", "espresso"]));
    }

    #[test]
    fn test_title_tokens_join_description_tokens() {
        let detector = SimilarityDetector::default();
        let mut media = item("a1", "cat drinking coffee", 100, 100);
        media.title = "Sleepy Cat GIF".to_string();

        let d = detector.digest(&media);
        assert_eq!(d.tokens, tokens(&["cat", "drinking", "coffee", "sleepy"]));
    }

    #[test]
    fn test_shared_title_makes_near_duplicate() {
        let detector = SimilarityDetector::default();
        let mut first = item("a1", "monday", 200, 100);
        first.title = "Office Coffee Break Meeting".to_string();
        let mut second = item("a2", "tuesday", 200, 100);
        second.title = "Office Coffee Break Meeting".to_string();

        let accepted = vec![detector.digest(&first)];
        assert!(detector.is_duplicate(&detector.digest(&second), &accepted));
    }

    #[test]
    fn test_identity_key_from_url_when_id_missing() {
        let detector = SimilarityDetector::default();
        let mut media = item("xyz", "coffee", 100, 100);
        media.id = String::new();

        assert_eq!(detector.digest(&media).identity_key, "xyz");
    }

    #[test]
    fn test_identity_match_is_duplicate() {
        let detector = SimilarityDetector::default();
        let accepted = vec![digest(1.0, &["one"], "same")];
        let candidate = digest(3.0, &["other"], "same");
        assert!(detector.is_duplicate(&candidate, &accepted));
    }

    #[test]
    fn test_empty_identity_never_matches() {
        let detector = SimilarityDetector::default();
        let accepted = vec![digest(1.0, &["one"], "")];
        let candidate = digest(3.0, &["other"], "");
        assert!(!detector.is_duplicate(&candidate, &accepted));
    }

    #[test]
    fn test_close_aspect_and_overlap_is_duplicate() {
        let detector = SimilarityDetector::default();
        // 7 shared of 10 tokens: overlap 0.7
        let shared = ["aa1", "aa2", "aa3", "aa4", "aa5", "aa6", "aa7"];
        let mut a: Vec<&str> = shared.to_vec();
        a.extend(["bb1", "bb2", "bb3"]);
        let mut b: Vec<&str> = shared.to_vec();
        b.extend(["cc1", "cc2", "cc3"]);

        let accepted = vec![digest(1.50, &a, "first")];
        assert!(detector.is_duplicate(&digest(1.55, &b, "second"), &accepted));
        assert!(!detector.is_duplicate(&digest(1.70, &b, "second"), &accepted));
    }

    #[test]
    fn test_overlap_alone_is_not_enough() {
        let detector = SimilarityDetector::default();
        let accepted = vec![digest(1.0, &["coffee", "cat"], "a")];
        assert!(!detector.is_duplicate(&digest(1.0, &["dog", "walk"], "b"), &accepted));
        assert!(!detector.is_duplicate(&digest(2.0, &["coffee", "cat"], "b"), &accepted));
    }

    #[test]
    fn test_token_overlap() {
        assert_eq!(token_overlap(&tokens(&[]), &tokens(&[])), 0.0);
        assert_eq!(
            token_overlap(&tokens(&["a", "b"]), &tokens(&["a", "b", "c", "d"])),
            0.5
        );
    }

    #[test]
    fn test_thresholds_come_from_config() {
        let config = DedupConfig {
            aspect_ratio_epsilon: 0.5,
            token_overlap_threshold: 0.4,
            ..DedupConfig::default()
        };
        let detector = SimilarityDetector::new(&config);
        let accepted = vec![digest(1.0, &["coffee", "cat"], "a")];
        assert!(detector.is_duplicate(&digest(1.3, &["coffee", "dog"], "b"), &accepted));
    }
}
