//! Batch orchestration across queries
//!
//! Uncached queries run as concurrent pipelines with staggered starts, all
//! under one deadline. Pipelines still running at the deadline are left to
//! finish in the background; their cache writes serve later callers.

use crate::config::AcquisitionConfig;
use crate::model::MediaItem;
use crate::pipeline::{normalize_query, QueryPipeline};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Launch offset and overall budget of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Pipeline `i` starts `i * stagger` after the batch
    pub stagger: Duration,
    pub deadline: Duration,
    /// Per-read budget of the post-deadline cache fallback
    pub fallback_timeout: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from_config(&AcquisitionConfig::default())
    }
}

impl BatchSettings {
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self {
            stagger: Duration::from_millis(config.batch.stagger_ms),
            deadline: Duration::from_millis(config.batch.deadline_ms),
            fallback_timeout: Duration::from_millis(config.batch.fallback_timeout_ms),
        }
    }
}

pub struct BatchOrchestrator {
    pipeline: Arc<QueryPipeline>,
    settings: BatchSettings,
}

impl BatchOrchestrator {
    pub fn new(pipeline: Arc<QueryPipeline>, settings: BatchSettings) -> Self {
        Self { pipeline, settings }
    }

    /// Run every distinct query and map each normalized query to its items
    ///
    /// Every distinct non-empty query gets an entry; queries that produced
    /// nothing in time map to an empty list.
    #[instrument(skip(self, queries), fields(queries = queries.len()))]
    pub async fn search_many(
        &self,
        queries: &[String],
        per_query_limit: usize,
    ) -> HashMap<String, Vec<MediaItem>> {
        let deadline = Instant::now() + self.settings.deadline;

        let mut seen = HashSet::new();
        let unique: Vec<String> = queries
            .iter()
            .map(|q| normalize_query(q))
            .filter(|q| !q.is_empty() && seen.insert(q.clone()))
            .collect();

        let lookups = unique
            .iter()
            .map(|query| async move { (query, self.pipeline.cached(query, per_query_limit).await) });

        let mut results = HashMap::with_capacity(unique.len());
        let mut pending = Vec::new();
        for (query, cached) in join_all(lookups).await {
            match cached {
                Some(items) => {
                    results.insert(query.clone(), items);
                }
                None => pending.push(query.clone()),
            }
        }

        debug!(
            cached = results.len(),
            launching = pending.len(),
            "Batch cache pass done"
        );

        let handles: Vec<_> = pending
            .iter()
            .enumerate()
            .map(|(index, query)| {
                let pipeline = Arc::clone(&self.pipeline);
                let query = query.clone();
                let delay = self.settings.stagger.saturating_mul(index as u32);
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let items = pipeline.search(&query, per_query_limit).await;
                    (query, items)
                })
            })
            .collect();

        match tokio::time::timeout_at(deadline, join_all(handles)).await {
            Ok(outcomes) => {
                for outcome in outcomes {
                    match outcome {
                        Ok((query, items)) => {
                            results.insert(query, items);
                        }
                        Err(e) => warn!(error = %e, "Query pipeline task failed"),
                    }
                }
            }
            Err(_) => {
                // Dropping the join handles detaches the tasks.
                warn!(
                    deadline_ms = self.settings.deadline.as_millis() as u64,
                    "Batch deadline reached; falling back to cache"
                );
            }
        }

        let fallbacks: Vec<_> = unique
            .iter()
            .filter(|query| !results.contains_key(*query))
            .map(|query| self.fallback(query, per_query_limit))
            .collect();
        for (query, items) in join_all(fallbacks).await {
            results.insert(query, items);
        }

        info!(
            queries = unique.len(),
            items = results.values().map(Vec::len).sum::<usize>(),
            "Batch finished"
        );
        results
    }

    /// Whatever the cache holds for `query`, read within the fallback budget
    async fn fallback(&self, query: &str, per_query_limit: usize) -> (String, Vec<MediaItem>) {
        let read = tokio::time::timeout(self.settings.fallback_timeout, self.pipeline.cached_set(query));
        let mut items = match read.await {
            Ok(set) => set.map(|set| set.items).unwrap_or_default(),
            Err(_) => {
                warn!(query = %query, "Fallback cache read timed out");
                Vec::new()
            }
        };
        items.truncate(per_query_limit);
        (query.to_string(), items)
    }
}
