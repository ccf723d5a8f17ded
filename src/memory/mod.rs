//! Memory records and their lifecycle.
//!
//! - [`types`]: [`Memory`](types::Memory), [`Category`](types::Category), [`Status`](types::Status)
//! - [`repository`]: the persistence trait
//! - [`store`]: create, update, supersede, forget, delete
//! - [`search`]: cosine-similarity ranking over active memories

pub mod repository;
pub mod search;
pub mod store;
pub mod types;

pub use repository::{ListOptions, MemoryRepository};
pub use search::{SearchOptions, SearchResult};
pub use store::MemoryStore;
pub use types::{Category, Memory, NewMemory, Status};
