//! Persistence interface consumed by [`MemoryStore`](super::store::MemoryStore).
//!
//! The store owns lifecycle rules; a repository only persists what it is told.
//! [`SqliteRepository`](crate::db::repository::SqliteRepository) is the bundled
//! implementation.

use crate::error::Result;
use crate::memory::types::Memory;

/// Paging and scoping for [`MemoryRepository::list`].
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub agent_handle: Option<String>,
    pub limit: usize,
    pub offset: usize,
    /// Include superseded, archived, and forgotten memories.
    pub include_inactive: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            agent_handle: None,
            limit: 50,
            offset: 0,
            include_inactive: false,
        }
    }
}

/// Durable memory storage keyed by id.
///
/// Implementations decide their own locking; callers get no mutual exclusion
/// across calls beyond what the implementation provides.
pub trait MemoryRepository: Send + Sync {
    /// Store a fully-populated new record.
    fn insert(&self, memory: &Memory) -> Result<()>;

    /// Overwrite content, scope, category, embedding, provenance, and confidence.
    /// Lifecycle fields are changed only through the dedicated methods below.
    fn update(&self, memory: &Memory) -> Result<()>;

    /// Flip an active record to `superseded`, linking it to its replacement.
    fn mark_superseded(&self, old_id: &str, new_id: &str, reason: &str) -> Result<()>;

    /// Mark a record `forgotten`. Superseded records keep their status.
    fn soft_delete(&self, id: &str) -> Result<()>;

    /// Mark an active record `archived`.
    fn archive(&self, id: &str) -> Result<()>;

    /// Mark every active record for `agent_handle` (or all, if `None`) `forgotten`.
    /// Returns the number of records changed.
    fn soft_delete_scope(&self, agent_handle: Option<&str>) -> Result<usize>;

    /// Permanently remove a record.
    fn hard_delete(&self, id: &str) -> Result<()>;

    fn fetch(&self, id: &str) -> Result<Option<Memory>>;

    /// Active records whose id starts with `prefix`.
    fn fetch_active_by_prefix(&self, prefix: &str) -> Result<Vec<Memory>>;

    /// Every active record matching the scope filters. `None` means unfiltered.
    fn search_candidates(
        &self,
        agent_handle: Option<&str>,
        path_scope: Option<&str>,
    ) -> Result<Vec<Memory>>;

    /// Newest first.
    fn list(&self, options: &ListOptions) -> Result<Vec<Memory>>;

    /// Number of active records, optionally scoped to one agent.
    fn count(&self, agent_handle: Option<&str>) -> Result<usize>;

    /// Bump `access_count` and set `last_accessed_at` on each id.
    fn touch_access(&self, ids: &[&str], accessed_at: &str) -> Result<()>;

    fn set_embedding(&self, id: &str, embedding: &[f32]) -> Result<()>;

    /// Active records that have no stored vector, oldest first.
    fn missing_embeddings(&self, limit: usize) -> Result<Vec<Memory>>;
}
