//! Embedding generation seam.
//!
//! The pipeline treats embedding generation as an external collaborator with
//! unspecified latency and cost: the [`EmbeddingProvider`] trait accepts a
//! batch of texts and returns one vector per text. Two implementations ship
//! here — an OpenAI-compatible HTTP provider for real runs, and a
//! deterministic [`MockEmbeddingProvider`] for tests and offline work.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::errors::IngestError;

/// Batch embedding generation.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier for diagnostics (`"openai"`, `"mock"`).
    fn id(&self) -> &str;

    /// Embed every text in `texts`, preserving order.
    ///
    /// Implementations must return exactly one vector per input text or an
    /// error; the batched vector write depends on positional pairing.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError>;
}

/// OpenAI-compatible `/embeddings` HTTP provider.
pub struct OpenAiEmbeddingProvider {
    http: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    /// Build a provider against `api_base` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        api_base: &Url,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, IngestError> {
        let endpoint = api_base
            .join("embeddings")
            .map_err(|err| IngestError::InvalidEnv {
                key: "EMBEDDING_API_URL".into(),
                message: err.to_string(),
            })?;
        Ok(Self {
            http: Client::new(),
            endpoint,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn id(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, texts), fields(batch = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await
            .map_err(IngestError::embedding)?
            .error_for_status()
            .map_err(IngestError::embedding)?;

        let parsed: EmbeddingResponse = response.json().await.map_err(IngestError::embedding)?;
        if parsed.data.len() != texts.len() {
            return Err(IngestError::Embedding {
                message: format!(
                    "provider returned {} vectors for {} inputs",
                    parsed.data.len(),
                    texts.len()
                ),
            });
        }
        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }
}

/// Deterministic embedding provider for tests and offline runs.
///
/// Vectors are derived from a hash of the input text, so identical texts
/// always embed identically and distinct texts almost always differ.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddingProvider {
    /// 64-dimensional provider.
    pub fn new() -> Self {
        Self { dims: 64 }
    }

    /// Provider with a custom dimensionality.
    pub fn with_dims(dims: usize) -> Self {
        Self { dims }
    }

    /// Vector dimensionality produced by this provider.
    pub fn dims(&self) -> usize {
        self.dims
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        // FNV-1a seed, then a linear congruential walk per dimension.
        let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.as_bytes() {
            seed ^= u64::from(*byte);
            seed = seed.wrapping_mul(0x0000_0100_0000_01b3);
        }

        let mut state = seed | 1;
        let mut vector = Vec::with_capacity(self.dims);
        for _ in 0..self.dims {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let value = ((state >> 33) as f32 / (u32::MAX >> 1) as f32) - 1.0;
            vector.push(value);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn id(&self) -> &str {
        "mock"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "Material agreement signed".to_string(),
            "Financial statements and exhibits".to_string(),
            "Material agreement signed".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn mock_vectors_are_unit_length() {
        let provider = MockEmbeddingProvider::with_dims(16);
        let vectors = provider
            .embed_batch(&["some disclosure text".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0].len(), 16);
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let provider = MockEmbeddingProvider::new();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
