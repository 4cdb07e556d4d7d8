//! Embedding generation
//!
//! This module provides an abstraction over embedding backends with:
//! - A trait implemented by each backend (local sidecar, HuggingFace, Ollama, OpenAI)
//! - Health probing, retry with backoff and pacing handled per backend
//! - Batch processing that either returns one vector per input or fails

mod client;
mod huggingface;
mod local;
mod ollama;
mod openai;
mod retry;

pub use huggingface::HuggingFaceEmbedder;
pub use local::LocalEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use retry::*;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::{debug, info};

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Check the backend is ready; backends without a health endpoint always pass
    async fn health(&self) -> Result<()> {
        Ok(())
    }

    /// Embed a batch of texts with a single backend call sequence
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Expected embedding dimension, if known up front
    fn dimension(&self) -> Option<usize>;

    /// Get the model name
    fn model_name(&self) -> &str;

    fn provider(&self) -> EmbeddingProvider;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    info!(
        "Using {} embeddings with model {}",
        config.provider,
        config.resolved_model()
    );
    let embedder: Box<dyn Embedder> = match config.provider {
        EmbeddingProvider::Local => Box::new(LocalEmbedder::new(config)?),
        EmbeddingProvider::Huggingface => Box::new(HuggingFaceEmbedder::new(config)?),
        EmbeddingProvider::Ollama => Box::new(OllamaEmbedder::new(config)?),
        EmbeddingProvider::Openai => Box::new(OpenAiEmbedder::new(config)?),
    };
    Ok(embedder)
}

/// Embed all texts in batches.
///
/// Each batch is preceded by a health check. The result has exactly one
/// vector per input, all of one dimension, or the whole call fails.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let mut all_embeddings = Vec::with_capacity(texts.len());
    let mut dimension = embedder.dimension();

    for chunk in texts.chunks(batch_size.max(1)) {
        embedder.health().await?;

        let embeddings = embedder.embed(chunk.to_vec()).await?;
        if embeddings.len() != chunk.len() {
            return Err(Error::Embedding(format!(
                "{} returned {} embeddings for {} inputs",
                embedder.model_name(),
                embeddings.len(),
                chunk.len()
            )));
        }

        for vector in &embeddings {
            if vector.is_empty() {
                return Err(Error::Embedding(format!(
                    "{} returned an empty embedding",
                    embedder.model_name()
                )));
            }
            match dimension {
                Some(expected) if expected != vector.len() => {
                    return Err(Error::Embedding(format!(
                        "Embedding dimension mismatch for model '{}': expected {}, got {}",
                        embedder.model_name(),
                        expected,
                        vector.len()
                    )));
                }
                Some(_) => {}
                None => dimension = Some(vector.len()),
            }
        }

        all_embeddings.extend(embeddings);
    }

    debug!(
        "Embedded {} texts with {} ({} dimensions)",
        all_embeddings.len(),
        embedder.model_name(),
        dimension.unwrap_or_default()
    );
    Ok(all_embeddings)
}
