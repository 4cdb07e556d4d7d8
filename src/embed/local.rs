//! Locally hosted embedding sidecar (`GET /health`, `POST /embed`)

use super::client::BackendClient;
use super::Embedder;
use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    dimension: Option<usize>,
}

pub struct LocalEmbedder {
    client: BackendClient,
    model: String,
    dimension: Option<usize>,
}

impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: BackendClient::new(config, None, "local embedding service")?,
            model: config.resolved_model(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn health(&self) -> Result<()> {
        self.client.check_health("/health").await
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let response: EmbedResponse = self
            .client
            .post_json("/embed", &EmbedRequest { texts: &texts })
            .await?;

        if let Some(count) = response.count {
            if count != response.embeddings.len() {
                return Err(Error::Embedding(format!(
                    "local embedding service reported {} embeddings but sent {}",
                    count,
                    response.embeddings.len()
                )));
            }
        }
        if let (Some(reported), Some(first)) = (response.dimension, response.embeddings.first()) {
            if reported != first.len() {
                return Err(Error::Embedding(format!(
                    "local embedding service reported dimension {} but vectors have {}",
                    reported,
                    first.len()
                )));
            }
        }
        Ok(response.embeddings)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> EmbeddingProvider {
        EmbeddingProvider::Local
    }
}
