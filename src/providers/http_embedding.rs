//! HTTP client for a remote embedding service
//!
//! Speaks a minimal JSON contract: POST /embed {"text": "..."} returning
//! {"embedding": [f32; D]}. Dimension mismatches are provider errors, not
//! silent truncations.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::{MemoryError, Result};
use crate::providers::embedding::{prepare_embedding_text, EmbeddingProvider, EMBEDDING_DIM};

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedding provider backed by a remote HTTP service
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    dim: usize,
}

impl HttpEmbeddingClient {
    /// Create a new client for the given service base URL
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MemoryError::provider("embedding", e))?;

        Ok(Self {
            client,
            base_url,
            dim: EMBEDDING_DIM,
        })
    }

    /// Override the expected embedding dimension
    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    /// Check if the embedding service is reachable
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embed", self.base_url);
        let prepared = prepare_embedding_text(text);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "text": prepared }))
            .send()
            .await
            .map_err(|e| MemoryError::provider("embedding", format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MemoryError::provider(
                "embedding",
                format!("service returned {}", response.status()),
            ));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::provider("embedding", format!("bad response: {}", e)))?;

        if body.embedding.len() != self.dim {
            return Err(MemoryError::provider(
                "embedding",
                format!(
                    "expected dimension {}, got {}",
                    self.dim,
                    body.embedding.len()
                ),
            ));
        }

        Ok(body.embedding)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client =
            HttpEmbeddingClient::new("http://localhost:9090".to_string(), Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.dimension(), EMBEDDING_DIM);
    }

    #[test]
    fn test_dimension_override() {
        let client =
            HttpEmbeddingClient::new("http://localhost:9090".to_string(), Duration::from_secs(5))
                .unwrap()
                .with_dimension(384);
        assert_eq!(client.dimension(), 384);
    }

    #[tokio::test]
    #[ignore] // Requires a running embedding service
    async fn test_embed_integration() {
        let client =
            HttpEmbeddingClient::new("http://localhost:9090".to_string(), Duration::from_secs(5))
                .unwrap();
        let vector = client.embed("hello world").await.unwrap();
        assert_eq!(vector.len(), EMBEDDING_DIM);
    }
}
