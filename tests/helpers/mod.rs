#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mnemos::db::repository::SqliteRepository;
use mnemos::embedding::hashing::HashingEmbedder;
use mnemos::embedding::Embedder;
use mnemos::memory::MemoryStore;

pub const DIM: usize = 64;

/// Fresh in-memory repository with schema and migrations applied.
pub fn test_repo() -> Arc<SqliteRepository> {
    Arc::new(SqliteRepository::in_memory().unwrap())
}

/// Store backed by an in-memory repository and the given embedder.
pub fn test_store(embedder: Arc<dyn Embedder>) -> MemoryStore {
    MemoryStore::new(test_repo(), Some(embedder))
}

/// Store using the deterministic bag-of-words embedder.
pub fn hashing_store() -> MemoryStore {
    test_store(Arc::new(HashingEmbedder::new(384).unwrap()))
}

/// Unit vector with a spike at position `seed`. Distinct seeds are orthogonal.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[seed % DIM] = 1.0;
    v
}

/// Unit vector whose cosine similarity to `test_embedding(seed)` is exactly `similarity`.
pub fn similar_embedding(seed: usize, similarity: f32) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[seed % DIM] = similarity;
    v[(seed + 1) % DIM] = (1.0 - similarity * similarity).sqrt();
    v
}

/// Embedder returning fixed vectors for known texts and spikes for everything else.
///
/// Unknown texts get a spike at a position derived from the text length, offset
/// past the fixed vectors so they never collide with them.
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl FixedEmbedder {
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, Vec<f32>)>) -> Self {
        Self {
            vectors: pairs
                .into_iter()
                .map(|(text, v)| (text.to_string(), v))
                .collect(),
        }
    }
}

impl Embedder for FixedEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                self.vectors
                    .get(*t)
                    .cloned()
                    .unwrap_or_else(|| test_embedding(32 + t.len() % 32))
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_id(&self) -> String {
        "fixed-test".into()
    }
}

/// Wraps another embedder and fails every call while `down` is set.
pub struct FlakyEmbedder {
    inner: HashingEmbedder,
    pub down: AtomicBool,
}

impl FlakyEmbedder {
    pub fn new(down: bool) -> Self {
        Self {
            inner: HashingEmbedder::new(DIM).unwrap(),
            down: AtomicBool::new(down),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

impl Embedder for FlakyEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::ensure!(!self.down.load(Ordering::SeqCst), "embedding provider unreachable");
        self.inner.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_id(&self) -> String {
        "flaky-test".into()
    }
}
