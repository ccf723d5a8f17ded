//! Semantic search over stored memories.
//!
//! Embeds the query, loads active candidates within the requested scope, and ranks
//! them by cosine similarity with a linear scan. Candidates without a usable vector
//! (none stored, or a dimension that does not match the query) are skipped.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{MemoryError, Result};
use crate::memory::store::MemoryStore;
use crate::memory::types::{Category, Memory};
use crate::vector::cosine_similarity;

/// Options for [`MemoryStore::search`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Only memories owned by this agent.
    pub agent_handle: Option<String>,
    /// Only memories scoped to this path.
    pub path_scope: Option<String>,
    /// Minimum cosine similarity for a hit.
    pub threshold: f32,
    pub limit: usize,
    /// Restrict hits to these categories.
    pub categories: Option<Vec<Category>>,
    /// Record the hit on each returned memory. Dedup probes turn this off.
    pub track_access: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            agent_handle: None,
            path_scope: None,
            threshold: 0.5,
            limit: 10,
            categories: None,
            track_access: true,
        }
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub memory: Memory,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
    /// `1 - similarity`.
    pub distance: f32,
}

impl MemoryStore {
    /// Rank active memories by similarity to `query`.
    ///
    /// Returns an empty list when no embedder is configured. Fails with
    /// [`MemoryError::Embedding`] when the query cannot be embedded.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let Some(embedder) = self.embedder() else {
            debug!("search skipped, no embedder configured");
            return Ok(Vec::new());
        };
        if options.limit == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embedder
            .embed(query)
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;

        let candidates = self
            .repo()
            .search_candidates(options.agent_handle.as_deref(), options.path_scope.as_deref())?;
        let scanned = candidates.len();

        let mut skipped = 0usize;
        let mut results: Vec<SearchResult> = Vec::new();
        for memory in candidates {
            if let Some(categories) = &options.categories {
                if !categories.contains(&memory.category) {
                    continue;
                }
            }
            let similarity = match memory.embedding.as_deref() {
                Some(v) if !v.is_empty() && v.len() == query_vec.len() => {
                    cosine_similarity(&query_vec, v)
                }
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            if !similarity.is_finite() {
                skipped += 1;
                continue;
            }
            if similarity < options.threshold {
                continue;
            }
            results.push(SearchResult {
                memory,
                similarity,
                distance: 1.0 - similarity,
            });
        }

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(options.limit);

        if skipped > 0 {
            warn!(skipped, "skipped candidates without a usable vector");
        }
        debug!(scanned, hits = results.len(), "search complete");

        if options.track_access && !results.is_empty() {
            let now = chrono::Utc::now().to_rfc3339();
            let ids: Vec<&str> = results.iter().map(|r| r.memory.id.as_str()).collect();
            match self.repo().touch_access(&ids, &now) {
                Ok(()) => {
                    for r in &mut results {
                        r.memory.access_count += 1;
                        r.memory.last_accessed_at = Some(now.clone());
                    }
                }
                Err(e) => warn!(error = %e, "failed to record memory access"),
            }
        }

        Ok(results)
    }
}
