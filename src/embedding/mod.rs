//! Text-to-vector embedding.
//!
//! Provides the [`Embedder`] trait and its implementations:
//!
//! - [`local::LocalEmbedder`]: ONNX Runtime sentence encoder with the in-crate
//!   WordPiece [`Tokenizer`](crate::tokenizer::Tokenizer)
//! - [`remote::RemoteEmbedder`]: HTTP embedding providers (OpenAI-style batch,
//!   Ollama-style single input)
//! - [`hashing::HashingEmbedder`]: deterministic bag-of-words vectors, no model needed
//!
//! Every implementation returns L2-normalized vectors, so vectors from one
//! embedder are comparable by cosine similarity. Mixing embedders within one
//! database is not guarded against; the database records the configured model
//! and the server warns when it changes.

pub mod hashing;
pub mod local;
pub mod remote;
pub mod runtime;

use std::sync::Arc;

use anyhow::Result;

use crate::config::EmbeddingConfig;

/// Default dimension (all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSION: usize = 384;

/// Trait for embedding text into vectors.
///
/// All methods are synchronous. Callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text])?;
        anyhow::ensure!(vectors.len() == 1, "embedder returned {} vectors for 1 input", vectors.len());
        Ok(vectors.remove(0))
    }

    /// Embed a batch of texts. The output preserves input order and length.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Number of dimensions this embedder produces.
    fn dimension(&self) -> usize;

    /// Short identifier recorded alongside stored vectors, e.g. `local:all-MiniLM-L6-v2`.
    fn model_id(&self) -> String;

    /// Release underlying resources. Later calls to `embed` fail.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Create an embedder from config.
///
/// Supported providers: `local`, `openai`, `ollama`, `hash`. Configuration errors
/// (missing model files, missing API key, unknown provider) are returned here rather
/// than on first use.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    anyhow::ensure!(config.dimension > 0, "embedding.dimension must be positive");
    match config.provider.as_str() {
        "local" => {
            let embedder =
                local::LocalEmbedder::new(config, runtime::TensorRuntime::shared())?;
            Ok(Arc::new(embedder))
        }
        "openai" | "ollama" => {
            let embedder = remote::RemoteEmbedder::from_config(config)?;
            Ok(Arc::new(embedder))
        }
        "hash" => Ok(Arc::new(hashing::HashingEmbedder::new(config.dimension)?)),
        other => anyhow::bail!(
            "unknown embedding provider: {other}. Supported: local, openai, ollama, hash"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_rejected() {
        let config = EmbeddingConfig {
            provider: "word2vec".into(),
            ..EmbeddingConfig::default()
        };
        let err = create_embedder(&config).err().expect("should fail");
        assert!(err.to_string().contains("unknown embedding provider"));
    }

    #[test]
    fn test_hash_provider() {
        let config = EmbeddingConfig {
            provider: "hash".into(),
            dimension: 64,
            ..EmbeddingConfig::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 64);
        assert_eq!(embedder.embed("hello").unwrap().len(), 64);
    }

    #[test]
    fn test_zero_dimension_is_rejected() {
        for provider in ["hash", "local", "openai", "ollama"] {
            let config = EmbeddingConfig {
                provider: provider.into(),
                dimension: 0,
                ..EmbeddingConfig::default()
            };
            let err = create_embedder(&config).err().expect("should fail");
            assert!(err.to_string().contains("dimension must be positive"), "{provider}: {err}");
        }
    }

    #[test]
    fn test_local_provider_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbeddingConfig {
            provider: "local".into(),
            cache_dir: dir.path().to_string_lossy().into_owned(),
            ..EmbeddingConfig::default()
        };
        let err = create_embedder(&config).err().expect("should fail");
        assert!(err.to_string().contains("model download"));
    }
}
