//! Hosted HuggingFace inference (feature-extraction pipeline)
//!
//! A 503 while the model loads is retried like a rate limit.

use super::client::BackendClient;
use super::Embedder;
use crate::config::{resolve_secret, EmbeddingConfig, EmbeddingProvider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

/// Sentence models return one vector per input, token models one per token
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Pooled(Vec<Vec<f32>>),
    PerToken(Vec<Vec<Vec<f32>>>),
}

impl FeatureExtractionResponse {
    fn into_embeddings(self) -> Result<Vec<Vec<f32>>> {
        match self {
            FeatureExtractionResponse::Pooled(vectors) => Ok(vectors),
            FeatureExtractionResponse::PerToken(batches) => {
                batches.into_iter().map(|tokens| mean_pool(&tokens)).collect()
            }
        }
    }
}

fn mean_pool(tokens: &[Vec<f32>]) -> Result<Vec<f32>> {
    let first = tokens
        .first()
        .ok_or_else(|| Error::Embedding("HuggingFace returned no token vectors".to_string()))?;
    let mut sum = vec![0.0f32; first.len()];
    for token in tokens {
        if token.len() != sum.len() {
            return Err(Error::Embedding(
                "HuggingFace returned ragged token vectors".to_string(),
            ));
        }
        for (acc, v) in sum.iter_mut().zip(token) {
            *acc += v;
        }
    }
    let n = tokens.len() as f32;
    Ok(sum.into_iter().map(|v| v / n).collect())
}

pub struct HuggingFaceEmbedder {
    client: BackendClient,
    model: String,
    dimension: Option<usize>,
}

impl HuggingFaceEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let key_env = config
            .resolved_api_key_env()
            .unwrap_or_else(|| "HUGGINGFACE_API_KEY".to_string());
        let api_key = resolve_secret(&key_env)?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: BackendClient::new(config, Some(api_key), "HuggingFace inference")?,
            model: config.resolved_model(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let path = format!("/pipeline/feature-extraction/{}", self.model);
        let request = FeatureExtractionRequest {
            inputs: &texts,
            options: RequestOptions {
                wait_for_model: true,
            },
        };
        let response: FeatureExtractionResponse = self.client.post_json(&path, &request).await?;
        response.into_embeddings()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> EmbeddingProvider {
        EmbeddingProvider::Huggingface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: EmbeddingProvider::Huggingface,
            url: Some(url.to_string()),
            model: Some("org/model".to_string()),
            retry_delay_ms: 10,
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_warm_up_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pipeline/feature-extraction/org/model"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(json!({"error": "Model is loading", "estimated_time": 1.0})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/pipeline/feature-extraction/org/model"))
            .and(header("authorization", "Bearer hf_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[1.0, 0.0]])))
            .mount(&server)
            .await;

        let embedder =
            HuggingFaceEmbedder::with_api_key(&config(&server.uri()), "hf_test".to_string())
                .unwrap();
        let vectors = embedder.embed(vec!["x".into()]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0]]);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_token_vectors_are_mean_pooled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([[[1.0, 2.0], [3.0, 4.0]]])),
            )
            .mount(&server)
            .await;

        let embedder =
            HuggingFaceEmbedder::with_api_key(&config(&server.uri()), "k".to_string()).unwrap();
        let vectors = embedder.embed(vec!["x".into()]).await.unwrap();
        assert_eq!(vectors, vec![vec![2.0, 3.0]]);
    }
}
