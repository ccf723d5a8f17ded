//! Memory formation: turning a "remember this" intent into a stored memory.
//!
//! [`form`] is the single decision procedure. It probes the store for the closest
//! active memory in the intent's scope and then:
//!
//! | Best similarity        | Outcome                                         |
//! |------------------------|-------------------------------------------------|
//! | none ≥ 0.85            | [`FormationOutcome::Created`]                   |
//! | ≥ 0.95                 | [`FormationOutcome::Deduplicated`], no write    |
//! | in `[0.85, 0.95)`      | [`FormationOutcome::Superseded`] the old memory |
//!
//! [`pipeline::FormationPipeline`] runs the same procedure from a bounded queue.

pub mod pipeline;

use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::memory::search::{SearchOptions, SearchResult};
use crate::memory::store::MemoryStore;
use crate::memory::types::{Category, Memory, NewMemory};

pub use pipeline::{FormationObserver, FormationPipeline, RequestStatus};

/// Similarity at or above which an existing memory is replaced.
pub const SUPERSEDE_THRESHOLD: f32 = 0.85;

/// Similarity at or above which the intent is a duplicate.
pub const EXACT_THRESHOLD: f32 = 0.95;

/// Reason recorded on memories replaced by formation.
pub const SUPERSEDE_REASON: &str = "updated via memory formation";

/// A request to remember something.
#[derive(Debug, Clone, PartialEq)]
pub struct FormationIntent {
    /// Request id, reported back in every status notification and result.
    pub id: String,
    pub content: String,
    pub category: Category,
    pub agent_handle: Option<String>,
    pub path_scope: Option<String>,
    pub confidence: Option<f64>,
    pub source_session_id: Option<String>,
    pub source_message_id: Option<String>,
}

impl FormationIntent {
    pub fn new(content: impl Into<String>, category: Category) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            content: content.into(),
            category,
            agent_handle: None,
            path_scope: None,
            confidence: None,
            source_session_id: None,
            source_message_id: None,
        }
    }

    pub fn agent(mut self, handle: impl Into<String>) -> Self {
        self.agent_handle = Some(handle.into());
        self
    }

    pub fn path(mut self, scope: impl Into<String>) -> Self {
        self.path_scope = Some(scope.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_source(mut self, session_id: Option<String>, message_id: Option<String>) -> Self {
        self.source_session_id = session_id;
        self.source_message_id = message_id;
        self
    }

    fn to_new_memory(&self) -> NewMemory {
        let mut new = NewMemory::new(self.content.clone(), self.category)
            .with_source(self.source_session_id.clone(), self.source_message_id.clone());
        new.agent_handle = self.agent_handle.clone();
        new.path_scope = self.path_scope.clone();
        new.confidence = self.confidence;
        new
    }
}

/// What formation did with an intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FormationOutcome {
    Created,
    /// An existing memory already says this; it is returned unchanged.
    Deduplicated,
    Superseded { previous_id: String },
    Failed { reason: String },
}

impl FormationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Terminal result for one intent, identical for queued and direct formation.
#[derive(Debug, Clone, Serialize)]
pub struct FormationResult {
    pub intent_id: String,
    #[serde(flatten)]
    pub outcome: FormationOutcome,
    /// The created, existing, or replacement memory. `None` on failure.
    pub memory: Option<Memory>,
    /// Similarity of the best match found by the dedup probe, if any.
    pub similarity: Option<f32>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl FormationResult {
    pub(crate) fn failed(intent_id: &str, reason: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            intent_id: intent_id.to_string(),
            outcome: FormationOutcome::Failed {
                reason: reason.into(),
            },
            memory: None,
            similarity: None,
            elapsed,
        }
    }
}

#[derive(Debug, Error)]
pub enum FormationError {
    #[error("formation queue full, request {request_id} rejected")]
    QueueFull { request_id: String },

    #[error("formation pipeline is shut down, request {request_id} rejected")]
    Closed { request_id: String },

    #[error("formation request {request_id} is already pending")]
    DuplicateId { request_id: String },
}

/// Closest active memory in the intent's scope at or above [`SUPERSEDE_THRESHOLD`].
///
/// A failed probe counts as no match so formation falls through to creating.
fn best_match(store: &MemoryStore, intent: &FormationIntent) -> Option<SearchResult> {
    let options = SearchOptions {
        agent_handle: intent.agent_handle.clone(),
        path_scope: intent.path_scope.clone(),
        threshold: SUPERSEDE_THRESHOLD,
        limit: 1,
        categories: None,
        track_access: false,
    };
    match store.search(&intent.content, &options) {
        Ok(mut hits) => {
            if hits.is_empty() {
                None
            } else {
                Some(hits.swap_remove(0))
            }
        }
        Err(e) => {
            warn!(intent = %intent.id, error = %e, "dedup probe failed, creating new memory");
            None
        }
    }
}

/// Run the dedup/supersede decision for one intent.
pub fn form(store: &MemoryStore, intent: &FormationIntent) -> FormationResult {
    let started = Instant::now();

    let Some(hit) = best_match(store, intent) else {
        return match store.create(intent.to_new_memory()) {
            Ok(memory) => {
                debug!(intent = %intent.id, id = %memory.id, "formation created memory");
                FormationResult {
                    intent_id: intent.id.clone(),
                    outcome: FormationOutcome::Created,
                    memory: Some(memory),
                    similarity: None,
                    elapsed: started.elapsed(),
                }
            }
            Err(e) => FormationResult::failed(&intent.id, e.to_string(), started.elapsed()),
        };
    };

    let similarity = hit.similarity;
    if similarity >= EXACT_THRESHOLD {
        debug!(intent = %intent.id, id = %hit.memory.id, similarity, "formation deduplicated");
        return FormationResult {
            intent_id: intent.id.clone(),
            outcome: FormationOutcome::Deduplicated,
            memory: Some(hit.memory),
            similarity: Some(similarity),
            elapsed: started.elapsed(),
        };
    }

    let previous_id = hit.memory.id;
    match store.supersede(&previous_id, intent.to_new_memory(), SUPERSEDE_REASON) {
        Ok(memory) => {
            debug!(intent = %intent.id, old = %previous_id, new = %memory.id, similarity, "formation superseded");
            FormationResult {
                intent_id: intent.id.clone(),
                outcome: FormationOutcome::Superseded { previous_id },
                memory: Some(memory),
                similarity: Some(similarity),
                elapsed: started.elapsed(),
            }
        }
        Err(e) => {
            let mut result = FormationResult::failed(&intent.id, e.to_string(), started.elapsed());
            result.similarity = Some(similarity);
            result
        }
    }
}
