//! HTTP embedding providers.
//!
//! Two wire shapes are supported:
//!
//! - **Batch** (OpenAI-compatible): `POST {model, input: [..]}` →
//!   `{data: [{embedding, index}, ..]}`, one request per batch
//! - **Single** (Ollama-compatible): `POST {model, prompt}` → `{embedding}`,
//!   one request per text
//!
//! Uses the blocking `reqwest` client; call from `spawn_blocking` in async code.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::config::EmbeddingConfig;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
const OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/embeddings";

/// Request/response shape spoken by the provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Batch,
    Single,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct BatchResponse {
    data: Vec<BatchItem>,
}

#[derive(Deserialize)]
struct BatchItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Serialize)]
struct SingleRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct SingleResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by a remote HTTP endpoint.
pub struct RemoteEmbedder {
    client: reqwest::blocking::Client,
    provider: String,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    format: WireFormat,
}

impl RemoteEmbedder {
    pub fn new(
        provider: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        dimension: usize,
        format: WireFormat,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            provider: provider.into(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            dimension,
            format,
        })
    }

    /// Build from config. `openai` requires an API key; `ollama` does not.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let (default_endpoint, format) = match config.provider.as_str() {
            "openai" => {
                anyhow::ensure!(
                    config.api_key.as_deref().is_some_and(|k| !k.is_empty()),
                    "embedding provider 'openai' requires an API key (embedding.api_key or MNEMOS_API_KEY)"
                );
                (OPENAI_ENDPOINT, WireFormat::Batch)
            }
            "ollama" => (OLLAMA_ENDPOINT, WireFormat::Single),
            other => anyhow::bail!("not a remote embedding provider: {other}"),
        };
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| default_endpoint.to_string());

        tracing::info!(provider = %config.provider, endpoint = %endpoint, model = %config.model, "remote embedder configured");

        Self::new(
            config.provider.clone(),
            endpoint,
            config.api_key.clone(),
            config.model.clone(),
            config.dimension,
            format,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<reqwest::blocking::Response> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .with_context(|| format!("{} embedding request failed", self.provider))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            anyhow::bail!("{} embedding request returned HTTP {status}: {body}", self.provider);
        }
        Ok(response)
    }

    fn embed_batched(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let response: BatchResponse = self
            .post(&BatchRequest {
                model: &self.model,
                input: texts,
            })?
            .json()
            .context("invalid batch embedding response")?;
        order_batch(response.data, texts.len())
    }

    fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let response: SingleResponse = self
            .post(&SingleRequest {
                model: &self.model,
                prompt: text,
            })?
            .json()
            .context("invalid embedding response")?;
        Ok(response.embedding)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        anyhow::ensure!(
            vector.len() == self.dimension,
            "{} returned a {}-dimensional vector, expected {} (set embedding.dimension)",
            self.provider,
            vector.len(),
            self.dimension
        );
        Ok(())
    }
}

/// Put batch items back into input order, using `index` when the provider sends it.
fn order_batch(items: Vec<BatchItem>, expected: usize) -> Result<Vec<Vec<f32>>> {
    anyhow::ensure!(
        items.len() == expected,
        "provider returned {} embeddings for {expected} inputs",
        items.len()
    );
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, item) in items.into_iter().enumerate() {
        let index = item.index.unwrap_or(position);
        anyhow::ensure!(index < expected, "embedding index {index} out of range");
        anyhow::ensure!(slots[index].is_none(), "duplicate embedding index {index}");
        slots[index] = Some(item.embedding);
    }
    slots
        .into_iter()
        .map(|slot| slot.context("missing embedding in batch response"))
        .collect()
}

impl Embedder for RemoteEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let raw = match self.format {
            WireFormat::Batch => self.embed_batched(texts)?,
            WireFormat::Single => texts
                .iter()
                .map(|t| self.embed_single(t))
                .collect::<Result<Vec<_>>>()?,
        };

        raw.into_iter()
            .map(|mut v| {
                self.check_dimension(&v)?;
                crate::vector::normalize(&mut v);
                Ok(v)
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serve one canned JSON response per connection; returns the captured request bodies.
    fn serve_json(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/embed", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut bodies = Vec::new();
            for response in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap();
                        }
                    }
                }
                let mut body = vec![0u8; content_length];
                reader.read_exact(&mut body).unwrap();
                bodies.push(String::from_utf8(body).unwrap());

                let mut stream = reader.into_inner();
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                )
                .unwrap();
                stream.flush().unwrap();
            }
            bodies
        });
        (url, handle)
    }

    fn embedder(url: &str, format: WireFormat) -> RemoteEmbedder {
        RemoteEmbedder::new(
            "test",
            url,
            Some("secret".into()),
            "test-model",
            2,
            format,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_batch_wire_format() {
        let (url, server) = serve_json(vec![
            r#"{"data":[{"embedding":[0.0,2.0],"index":1},{"embedding":[3.0,4.0],"index":0}]}"#
                .to_string(),
        ]);
        let vectors = embedder(&url, WireFormat::Batch)
            .embed_batch(&["first", "second"])
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert!((vectors[0][0] - 0.6).abs() < 1e-6);
        assert!((vectors[0][1] - 0.8).abs() < 1e-6);
        assert!((vectors[1][1] - 1.0).abs() < 1e-6);

        let bodies = server.join().unwrap();
        let sent: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(sent["model"], "test-model");
        assert_eq!(sent["input"], serde_json::json!(["first", "second"]));
    }

    #[test]
    fn test_single_wire_format() {
        let (url, server) = serve_json(vec![
            r#"{"embedding":[1.0,0.0]}"#.to_string(),
            r#"{"embedding":[0.0,-5.0]}"#.to_string(),
        ]);
        let vectors = embedder(&url, WireFormat::Single)
            .embed_batch(&["a", "b"])
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, -1.0]]);

        let bodies = server.join().unwrap();
        assert_eq!(bodies.len(), 2);
        let second: serde_json::Value = serde_json::from_str(&bodies[1]).unwrap();
        assert_eq!(second["prompt"], "b");
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let (url, _server) = serve_json(vec![r#"{"embedding":[1.0,0.0,0.0]}"#.to_string()]);
        let err = embedder(&url, WireFormat::Single).embed("x").unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn test_order_batch_rejects_short_response() {
        let items = vec![BatchItem {
            embedding: vec![1.0],
            index: Some(0),
        }];
        assert!(order_batch(items, 2).is_err());
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = EmbeddingConfig {
            provider: "openai".into(),
            api_key: None,
            ..EmbeddingConfig::default()
        };
        let err = RemoteEmbedder::from_config(&config).err().expect("should fail");
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_ollama_defaults() {
        let config = EmbeddingConfig {
            provider: "ollama".into(),
            model: "nomic-embed-text".into(),
            ..EmbeddingConfig::default()
        };
        let embedder = RemoteEmbedder::from_config(&config).unwrap();
        assert_eq!(embedder.endpoint, OLLAMA_ENDPOINT);
        assert_eq!(embedder.format, WireFormat::Single);
        assert_eq!(embedder.model_id(), "ollama:nomic-embed-text");
    }
}
