//! Ollama daemon embeddings
//!
//! Ollama embeds one prompt per request, so batches are sent sequentially with
//! a pacing delay between requests.

use super::client::BackendClient;
use super::Embedder;
use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

pub struct OllamaEmbedder {
    client: BackendClient,
    model: String,
    dimension: Option<usize>,
    pacing: Duration,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: BackendClient::new(config, None, "Ollama")?,
            model: config.resolved_model(),
            dimension: config.dimension,
            pacing: Duration::from_millis(config.pacing_ms),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn health(&self) -> Result<()> {
        self.client.check_health("/api/tags").await
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            let request = EmbeddingRequest {
                model: &self.model,
                prompt: text,
            };
            let response: EmbeddingResponse =
                self.client.post_json("/api/embeddings", &request).await?;
            embeddings.push(response.embedding);
        }
        debug!("Ollama embedded {} texts with {}", embeddings.len(), self.model);
        Ok(embeddings)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> EmbeddingProvider {
        EmbeddingProvider::Ollama
    }
}
