//! Vector retrieval engine.
//!
//! Turns a query vector into a ranked, deduplicated list of document
//! filenames: fetch chunk candidates from the [`VectorIndex`], drop those
//! below the score threshold, collapse to one entry per document keeping
//! the highest chunk score, cap to the configured limit, and resolve names
//! through the [`DocumentRegistry`].
//!
//! An empty result is `Ok(vec![])` — always distinguishable from a query
//! failure, which is a retrieval-class error.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::index::VectorIndex;
use crate::processor::ProcessorClient;
use crate::registry::DocumentRegistry;

pub struct RetrievalEngine {
    index: Arc<dyn VectorIndex>,
    registry: Arc<dyn DocumentRegistry>,
    params: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        registry: Arc<dyn DocumentRegistry>,
        params: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            registry,
            params,
        }
    }

    /// Similarity search over all stored chunk vectors, returning the
    /// filenames of the best-matching documents in rank order.
    pub async fn search(&self, query_vec: &[f32]) -> PipelineResult<Vec<String>> {
        let hits = self
            .index
            .query(query_vec, self.params.num_candidates)
            .await?;

        // Post-filter and collapse to one entry per document, keeping the
        // highest score seen. A document is "found" if any of its chunks is
        // similar enough. First-occurrence order is remembered so that
        // float-equal scores rank deterministically.
        let mut first_seen: Vec<String> = Vec::new();
        let mut best: HashMap<String, f64> = HashMap::new();

        for hit in &hits {
            if hit.score < self.params.score_threshold {
                continue;
            }
            match best.get_mut(&hit.document_id) {
                Some(score) => {
                    if hit.score > *score {
                        *score = hit.score;
                    }
                }
                None => {
                    best.insert(hit.document_id.clone(), hit.score);
                    first_seen.push(hit.document_id.clone());
                }
            }
        }

        if first_seen.is_empty() {
            return Ok(Vec::new());
        }

        // Stable sort over first-occurrence order: equal scores keep the
        // earlier candidate ahead.
        let mut ranked: Vec<(String, f64)> = first_seen
            .into_iter()
            .map(|id| {
                let score = best[&id];
                (id, score)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.params.limit.max(0) as usize);

        let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
        let docs = self
            .registry
            .find_by_ids(&ids)
            .await
            .map_err(|e| PipelineError::Retrieval(e.to_string()))?;

        let name_by_id: HashMap<&str, &str> = docs
            .iter()
            .map(|d| (d.id.as_str(), d.filename.as_str()))
            .collect();

        // Stale chunk hits whose document no longer resolves are dropped:
        // a retrieval result never references a non-existent document.
        let filenames = ids
            .iter()
            .filter_map(|id| name_by_id.get(id.as_str()))
            .map(|name| name.to_string())
            .collect();

        Ok(filenames)
    }
}

/// Full query path: embed the query text via the processing service, then
/// run the similarity search. Used by both the CLI and the HTTP server.
pub async fn query_filenames(
    processor: &dyn ProcessorClient,
    engine: &RetrievalEngine,
    query: &str,
) -> PipelineResult<Vec<String>> {
    if query.trim().is_empty() {
        return Err(PipelineError::Validation(
            "query must not be empty".to_string(),
        ));
    }

    let query_vec = processor.embed_query(query).await?;
    engine.search(&query_vec).await
}
