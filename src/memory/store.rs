//! Memory lifecycle: create, update, supersede, forget, delete.
//!
//! [`MemoryStore`] is the only writer of lifecycle transitions. It stamps ids and
//! timestamps, embeds content best-effort on write (a memory whose embedding fails
//! is stored without a vector and can be embedded later via
//! [`MemoryStore::embed_missing`]), and delegates persistence to a
//! [`MemoryRepository`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::embedding::Embedder;
use crate::error::{MemoryError, Result};
use crate::memory::repository::{ListOptions, MemoryRepository};
use crate::memory::types::{Memory, NewMemory, Status};

/// Handle to the memory store. Cheap to clone.
#[derive(Clone)]
pub struct MemoryStore {
    repo: Arc<dyn MemoryRepository>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl MemoryStore {
    pub fn new(repo: Arc<dyn MemoryRepository>, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self { repo, embedder }
    }

    pub fn embedder(&self) -> Option<&Arc<dyn Embedder>> {
        self.embedder.as_ref()
    }

    pub(crate) fn repo(&self) -> &dyn MemoryRepository {
        self.repo.as_ref()
    }

    /// Embed `content`, logging and swallowing failures.
    fn try_embed(&self, content: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(content) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "embedding failed, storing memory without a vector");
                None
            }
        }
    }

    /// Store a new memory.
    ///
    /// Assigns a UUID v7 if `new.id` is unset, defaults confidence to 1.0, and
    /// embeds the content when no vector is supplied and an embedder is configured.
    pub fn create(&self, new: NewMemory) -> Result<Memory> {
        if new.content.trim().is_empty() {
            return Err(MemoryError::InvalidInput("content must not be empty".into()));
        }
        let confidence = new.confidence.unwrap_or(1.0);
        if !(0.0..=1.0).contains(&confidence) {
            return Err(MemoryError::InvalidInput(
                "confidence must be between 0.0 and 1.0".into(),
            ));
        }

        let embedding = match new.embedding {
            Some(v) => Some(v),
            None => self.try_embed(&new.content),
        };

        let now = chrono::Utc::now().to_rfc3339();
        let memory = Memory {
            id: new.id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
            agent_handle: new.agent_handle,
            path_scope: new.path_scope,
            content: new.content,
            category: new.category,
            embedding,
            source_session_id: new.source_session_id,
            source_message_id: new.source_message_id,
            created_at: now.clone(),
            updated_at: now,
            last_accessed_at: None,
            access_count: 0,
            confidence,
            supersedes_id: new.supersedes_id,
            superseded_by_id: None,
            supersede_reason: new.supersede_reason,
            status: Status::Active,
        };

        self.repo.insert(&memory)?;
        debug!(
            id = %memory.id,
            category = %memory.category,
            embedded = memory.embedding.is_some(),
            "memory created"
        );
        Ok(memory)
    }

    /// Fetch by id regardless of status.
    pub fn get(&self, id: &str) -> Result<Memory> {
        self.repo
            .fetch(id)?
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))
    }

    /// Resolve a unique id prefix among active memories.
    pub fn get_by_prefix(&self, prefix: &str) -> Result<Memory> {
        if prefix.is_empty() {
            return Err(MemoryError::InvalidInput("id prefix must not be empty".into()));
        }
        let mut matches = self.repo.fetch_active_by_prefix(prefix)?;
        match matches.len() {
            0 => Err(MemoryError::NotFound(prefix.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(MemoryError::AmbiguousPrefix {
                prefix: prefix.to_string(),
                matches: n,
            }),
        }
    }

    /// Persist edits to an existing memory. Re-embeds when the content changed.
    pub fn update(&self, mut memory: Memory) -> Result<Memory> {
        let existing = self.get(&memory.id)?;
        if !(0.0..=1.0).contains(&memory.confidence) {
            return Err(MemoryError::InvalidInput(
                "confidence must be between 0.0 and 1.0".into(),
            ));
        }

        if existing.content != memory.content && self.embedder.is_some() {
            // A failed re-embed drops the stale vector rather than keeping it.
            memory.embedding = self.try_embed(&memory.content);
        }
        memory.updated_at = chrono::Utc::now().to_rfc3339();

        self.repo.update(&memory)?;
        Ok(memory)
    }

    /// Replace `old_id` with a new memory, linking the two.
    ///
    /// Creates `new` with `supersedes_id = old_id`, then flips the old record to
    /// `superseded`. The two steps are not atomic: if the flip fails the new memory
    /// stays and [`MemoryError::SupersedeIncomplete`] is returned.
    pub fn supersede(&self, old_id: &str, mut new: NewMemory, reason: &str) -> Result<Memory> {
        let old = self.get(old_id)?;
        if !old.is_active() {
            return Err(MemoryError::NotActive {
                id: old.id,
                status: old.status,
            });
        }

        new.supersedes_id = Some(old.id.clone());
        new.supersede_reason = Some(reason.to_string());
        let created = self.create(new)?;

        if let Err(e) = self.repo.mark_superseded(&old.id, &created.id, reason) {
            warn!(old = %old.id, new = %created.id, error = %e, "supersede left the old memory active");
            return Err(MemoryError::SupersedeIncomplete {
                old_id: old.id,
                new_id: created.id,
                reason: e.to_string(),
            });
        }

        info!(old = %old.id, new = %created.id, reason, "memory superseded");
        Ok(created)
    }

    /// Soft delete: the record stays readable with `status = forgotten`.
    pub fn forget(&self, id: &str) -> Result<()> {
        self.repo.soft_delete(id)?;
        info!(id, "memory forgotten");
        Ok(())
    }

    /// Move an active memory out of search without forgetting it.
    pub fn archive(&self, id: &str) -> Result<()> {
        self.repo.archive(id)
    }

    /// Hard delete.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.repo.hard_delete(id)?;
        info!(id, "memory deleted");
        Ok(())
    }

    pub fn list(&self, options: &ListOptions) -> Result<Vec<Memory>> {
        self.repo.list(options)
    }

    /// Count active memories, optionally for one agent.
    pub fn count(&self, agent_handle: Option<&str>) -> Result<usize> {
        self.repo.count(agent_handle)
    }

    /// Forget every active memory for `agent_handle`, or all of them when `None`.
    pub fn clear(&self, agent_handle: Option<&str>) -> Result<usize> {
        let cleared = self.repo.soft_delete_scope(agent_handle)?;
        info!(agent = agent_handle.unwrap_or("*"), cleared, "memories cleared");
        Ok(cleared)
    }

    /// Embed active memories that have no stored vector, in batches.
    /// Returns how many were embedded.
    pub fn embed_missing(&self, batch_size: usize) -> Result<usize> {
        let embedder = self.embedder.as_ref().ok_or(MemoryError::NoEmbedder)?;
        let batch_size = batch_size.max(1);
        let mut total = 0;

        loop {
            let batch = self.repo.missing_embeddings(batch_size)?;
            if batch.is_empty() {
                break;
            }
            let texts: Vec<&str> = batch.iter().map(|m| m.content.as_str()).collect();
            let vectors = embedder
                .embed_batch(&texts)
                .map_err(|e| MemoryError::Embedding(e.to_string()))?;
            if vectors.len() != batch.len() {
                return Err(MemoryError::Embedding(format!(
                    "embedder returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (memory, vector) in batch.iter().zip(&vectors) {
                self.repo.set_embedding(&memory.id, vector)?;
            }
            total += batch.len();
            debug!(embedded = total, "embedded batch of missing vectors");
        }

        Ok(total)
    }
}
