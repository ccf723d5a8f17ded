//! Semantic memory for agents.
//!
//! mnemos stores short natural-language facts and preferences learned about a user or
//! project, retrieves them by meaning, and keeps independent detectors from flooding
//! storage with near-duplicates.
//!
//! # Architecture
//!
//! - **Embeddings**: local ONNX sentence encoder (all-MiniLM-L6-v2, 384 dimensions)
//!   with an in-crate WordPiece tokenizer, or a remote OpenAI/Ollama endpoint
//! - **Storage**: SQLite; vectors are stored as little-endian `f32` blobs
//! - **Search**: brute-force cosine similarity over the active memories in scope
//! - **Formation**: bounded queue with a single worker that creates, deduplicates,
//!   or supersedes
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML files and environment variables
//! - [`error`]: error types surfaced by the memory store
//! - [`vector`]: serialization, cosine similarity, normalization
//! - [`tokenizer`]: WordPiece tokenizer for HuggingFace `tokenizer.json` files
//! - [`embedding`]: the [`Embedder`](embedding::Embedder) trait and its implementations
//! - [`db`]: SQLite schema, migrations, and the bundled repository
//! - [`memory`]: memory types, lifecycle, and search
//! - [`formation`]: dedup/supersede decision and the formation queue
//! - [`triggers`]: phrase-based detection of things worth remembering

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod formation;
pub mod memory;
pub mod tokenizer;
pub mod triggers;
pub mod vector;
