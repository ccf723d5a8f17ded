//! Error taxonomy for the memory store and its persistence layer.
//!
//! Embedder construction and configuration failures use `anyhow` and are fatal at
//! construction time. Everything that crosses the [`MemoryStore`](crate::memory::store::MemoryStore)
//! API surfaces as a [`MemoryError`].

use thiserror::Error;

use crate::memory::types::Status;

/// Errors returned by memory lifecycle and search operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// No memory with this id (or prefix) exists.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// A prefix lookup matched more than one active memory.
    #[error("ambiguous id prefix '{prefix}': {matches} active memories match")]
    AmbiguousPrefix { prefix: String, matches: usize },

    /// The caller passed a value the store refuses to persist.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A lifecycle transition was attempted on a memory that is no longer active.
    #[error("memory {id} is {status}, expected active")]
    NotActive { id: String, status: Status },

    /// An operation that needs an embedder was called on a store without one.
    #[error("no embedder configured")]
    NoEmbedder,

    /// The embedder failed while vectorizing a query.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The replacement memory was stored but the old record could not be flipped.
    ///
    /// The new memory is left in place; there is no rollback.
    #[error("memory {new_id} was created but superseding {old_id} failed: {reason}")]
    SupersedeIncomplete {
        old_id: String,
        new_id: String,
        reason: String,
    },

    /// A stored value could not be decoded.
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
