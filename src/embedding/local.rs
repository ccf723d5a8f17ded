//! Local ONNX Runtime embedding provider.
//!
//! Implements [`Embedder`] using a BERT-style sentence encoder (all-MiniLM-L6-v2 by
//! default) via `ort`. Handles tokenization, fixed-width padding, inference, masked
//! mean pooling, and L2 normalization.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;

use super::runtime::TensorRuntime;
use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::tokenizer::{Encoding, Tokenizer};

/// Local ONNX-based embedding provider.
pub struct LocalEmbedder {
    session: Mutex<Option<Session>>,
    tokenizer: Tokenizer,
    dimension: usize,
    model: String,
    _runtime: Arc<TensorRuntime>,
}

// Safety: Tokenizer is plain data. Session is behind a Mutex, which
// guarantees exclusive access during run().
unsafe impl Send for LocalEmbedder {}
unsafe impl Sync for LocalEmbedder {}

impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig, runtime: Arc<TensorRuntime>) -> Result<Self> {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        let model_path = cache_dir.join("model.onnx");
        let tokenizer_path = cache_dir.join("tokenizer.json");

        anyhow::ensure!(
            model_path.exists(),
            "ONNX model not found at {}. Run `mnemos model download` first.",
            model_path.display()
        );
        anyhow::ensure!(
            tokenizer_path.exists(),
            "Tokenizer not found at {}. Run `mnemos model download` first.",
            tokenizer_path.display()
        );
        anyhow::ensure!(config.max_length >= 2, "embedding.max_length must be at least 2");

        runtime.ensure_initialized()?;

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;

        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let tokenizer = Tokenizer::from_file(&tokenizer_path, config.max_length)?;

        tracing::info!(
            tokenizer = %tokenizer_path.display(),
            vocab_size = tokenizer.vocab_size(),
            "tokenizer loaded"
        );

        Ok(Self {
            session: Mutex::new(Some(session)),
            tokenizer,
            dimension: config.dimension,
            model: config.model.clone(),
            _runtime: runtime,
        })
    }
}

/// Flatten encodings into `[batch, width]` row-major buffers, right-padded.
fn pad_batch(encodings: &[Encoding], width: usize, pad_id: i64) -> (Vec<i64>, Vec<i64>, Vec<i64>) {
    let total = encodings.len() * width;
    let mut ids = Vec::with_capacity(total);
    let mut mask = Vec::with_capacity(total);
    let mut types = Vec::with_capacity(total);

    for encoding in encodings {
        let len = encoding.len().min(width);
        ids.extend_from_slice(&encoding.input_ids[..len]);
        mask.extend_from_slice(&encoding.attention_mask[..len]);
        types.extend_from_slice(&encoding.token_type_ids[..len]);
        ids.resize(ids.len() + width - len, pad_id);
        mask.resize(mask.len() + width - len, 0);
        types.resize(types.len() + width - len, 0);
    }
    (ids, mask, types)
}

/// Average the hidden states of positions where the mask is 1, then L2-normalize.
///
/// `hidden` is `[batch, seq_len, hidden_dim]`; `mask` is `[batch, mask_width]`.
fn mean_pool(
    hidden: &[f32],
    mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    mask_width: usize,
    hidden_dim: usize,
) -> Vec<Vec<f32>> {
    let mut results = Vec::with_capacity(batch_size);
    for b in 0..batch_size {
        let mut sum = vec![0.0f32; hidden_dim];
        let mut count = 0usize;

        for s in 0..seq_len.min(mask_width) {
            if mask[b * mask_width + s] == 1 {
                let offset = (b * seq_len + s) * hidden_dim;
                for (d, acc) in sum.iter_mut().enumerate() {
                    *acc += hidden[offset + d];
                }
                count += 1;
            }
        }

        if count > 0 {
            for acc in &mut sum {
                *acc /= count as f32;
            }
        }

        crate::vector::normalize(&mut sum);
        results.push(sum);
    }
    results
}

impl Embedder for LocalEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Step 1: Tokenize and pad to the fixed sequence width
        let encodings: Vec<Encoding> = texts.iter().map(|t| self.tokenizer.encode(t)).collect();
        let batch_size = encodings.len();
        let seq_len = self.tokenizer.max_length();
        let (input_ids, attention_mask, token_type_ids) =
            pad_batch(&encodings, seq_len, self.tokenizer.pad_id() as i64);

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))?;
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;

        // Step 2: Run ONNX inference
        let mut guard = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let session = guard
            .as_mut()
            .context("local embedder has been closed")?;

        let outputs = session.run(ort::inputs! {
            "input_ids" => input_ids_tensor,
            "attention_mask" => attention_mask_tensor,
            "token_type_ids" => token_type_ids_tensor,
        })?;

        // Step 3: Extract token embeddings, shape [batch, seq_len, hidden]
        // The output name varies by ONNX export. Try common names, fall back to index 0.
        let token_emb_value = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (out_shape, data) = token_emb_value
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings tensor")?;

        let dims: &[i64] = &out_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] as usize == batch_size && dims[2] as usize == self.dimension,
            "unexpected token embeddings shape: {dims:?}, expected [{batch_size}, seq, {}]",
            self.dimension
        );

        // Step 4: Masked mean pooling + L2 normalize
        Ok(mean_pool(
            data,
            &attention_mask,
            batch_size,
            dims[1] as usize,
            seq_len,
            dims[2] as usize,
        ))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> String {
        format!("local:{}", self.model)
    }

    fn close(&self) -> Result<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        if guard.take().is_some() {
            tracing::info!(model = %self.model, "ONNX session released");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoding(ids: &[i64]) -> Encoding {
        Encoding {
            input_ids: ids.to_vec(),
            attention_mask: vec![1; ids.len()],
            token_type_ids: vec![0; ids.len()],
        }
    }

    #[test]
    fn test_pad_batch() {
        let (ids, mask, types) = pad_batch(&[encoding(&[101, 7, 102]), encoding(&[101, 102])], 4, 0);
        assert_eq!(ids, vec![101, 7, 102, 0, 101, 102, 0, 0]);
        assert_eq!(mask, vec![1, 1, 1, 0, 1, 1, 0, 0]);
        assert_eq!(types, vec![0; 8]);
    }

    #[test]
    fn test_mean_pool_ignores_masked_positions() {
        // batch 1, seq 3, hidden 2; last position is padding with huge values
        let hidden = vec![1.0, 0.0, 3.0, 0.0, 100.0, 100.0];
        let mask = vec![1, 1, 0];
        let pooled = mean_pool(&hidden, &mask, 1, 3, 3, 2);
        assert_eq!(pooled.len(), 1);
        // mean = [2, 0] → normalized [1, 0]
        assert!((pooled[0][0] - 1.0).abs() < 1e-6);
        assert!(pooled[0][1].abs() < 1e-6);
    }

    #[test]
    fn test_mean_pool_batch_is_normalized() {
        let hidden = vec![
            3.0, 4.0, 3.0, 4.0, // row 0
            0.0, 2.0, 9.0, 9.0, // row 1, second position masked
        ];
        let mask = vec![1, 1, 1, 0];
        let pooled = mean_pool(&hidden, &mask, 2, 2, 2, 2);
        assert!((pooled[0][0] - 0.6).abs() < 1e-6);
        assert!((pooled[0][1] - 0.8).abs() < 1e-6);
        assert!(pooled[1][0].abs() < 1e-6);
        assert!((pooled[1][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let pooled = mean_pool(&[5.0, 5.0], &[0], 1, 1, 1, 2);
        assert_eq!(pooled[0], vec![0.0, 0.0]);
    }

    fn test_config() -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "local".into(),
            cache_dir: dirs::home_dir()
                .expect("home dir")
                .join(".mnemos/models")
                .to_string_lossy()
                .into_owned(),
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    #[ignore] // Requires model files: run with: cargo test -- --ignored
    fn test_embed_produces_expected_dims() {
        let provider = LocalEmbedder::new(&test_config(), TensorRuntime::shared()).unwrap();
        let embedding = provider.embed("Hello world").unwrap();
        assert_eq!(embedding.len(), provider.dimension());
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "L2 norm should be ~1.0, got {norm}");
    }

    #[test]
    #[ignore]
    fn test_similar_texts_have_high_cosine_similarity() {
        let provider = LocalEmbedder::new(&test_config(), TensorRuntime::shared()).unwrap();
        let emb = provider
            .embed_batch(&[
                "The cat sat on the mat",
                "A cat was sitting on a mat",
                "Quantum computing uses qubits",
            ])
            .unwrap();
        let sim_similar = crate::vector::cosine_similarity(&emb[0], &emb[1]);
        let sim_different = crate::vector::cosine_similarity(&emb[0], &emb[2]);
        assert!(sim_similar > 0.7, "got {sim_similar}");
        assert!(sim_different < sim_similar);
    }

    #[test]
    #[ignore]
    fn test_close_rejects_further_embeds() {
        let provider = LocalEmbedder::new(&test_config(), TensorRuntime::shared()).unwrap();
        provider.close().unwrap();
        assert!(provider.embed("after close").is_err());
    }
}
