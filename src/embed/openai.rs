//! OpenAI embeddings API (`POST /v1/embeddings`)

use super::client::BackendClient;
use super::Embedder;
use crate::config::{resolve_secret, EmbeddingConfig, EmbeddingProvider};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbedder {
    client: BackendClient,
    model: String,
    dimension: Option<usize>,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let key_env = config
            .resolved_api_key_env()
            .unwrap_or_else(|| "OPENAI_API_KEY".to_string());
        Self::with_api_key(config, resolve_secret(&key_env)?)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: BackendClient::new(config, Some(api_key), "OpenAI embeddings")?,
            model: config.resolved_model(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input: &texts,
        };
        let mut response: EmbeddingsResponse =
            self.client.post_json("/v1/embeddings", &request).await?;
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> EmbeddingProvider {
        EmbeddingProvider::Openai
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(url: &str) -> OpenAiEmbedder {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Openai,
            url: Some(url.to_string()),
            retry_delay_ms: 10,
            ..EmbeddingConfig::default()
        };
        OpenAiEmbedder::with_api_key(&config, "sk-test".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_results_sorted_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let vectors = embedder(&server.uri())
            .embed(vec!["first".into(), "second".into()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [0.25]}]
            })))
            .mount(&server)
            .await;

        let vectors = embedder(&server.uri()).embed(vec!["x".into()]).await.unwrap();
        assert_eq!(vectors, vec![vec![0.25]]);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_three_rate_limits_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let result = embedder(&server.uri()).embed(vec!["x".into()]).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let result = embedder(&server.uri()).embed(vec!["x".into()]).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }
}
