//! Vision backends: Anthropic Messages API and OpenAI-compatible chat completions

use super::VisualAnalyzer;
use crate::config::{resolve_secret, VisionConfig};
use crate::error::{Error, Result};
use crate::http;
use crate::models::MediaAsset;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

pub const ANALYSIS_PROMPT: &str = "Analyze this image from a study material. Describe any charts, \
diagrams, equations, important visual information, or text that would be relevant for studying. \
Be detailed and educational.";

const ANTHROPIC_VERSION: &str = "2023-06-01";

async fn encode(image: &MediaAsset) -> Result<String> {
    let bytes = tokio::fs::read(&image.path).await.map_err(|e| {
        Error::Extraction(format!("Failed to read image {}: {}", image.path.display(), e))
    })?;
    Ok(STANDARD.encode(bytes))
}

pub struct AnthropicVision {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicVision {
    pub fn new(config: &VisionConfig) -> Result<Self> {
        Self::with_api_key(config, resolve_secret(&config.resolved_api_key_env())?)
    }

    pub fn with_api_key(config: &VisionConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: http::endpoint(&config.resolved_url(), "/v1/messages")?,
            api_key,
            model: config.resolved_model(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl VisualAnalyzer for AnthropicVision {
    async fn describe(&self, image: &MediaAsset) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": image.mime,
                            "data": encode(image).await?,
                        }
                    },
                    { "type": "text", "text": ANALYSIS_PROMPT }
                ]
            }]
        });

        let request = self
            .client
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let response: MessagesResponse =
            http::send_json(request, "Anthropic vision", Error::Extraction).await?;

        let text: String = response.content.into_iter().filter_map(|b| b.text).collect();
        debug!("Described {} ({} chars)", image.file_name(), text.len());
        Ok(text)
    }
}

pub struct OpenAiVision {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiVision {
    pub fn new(config: &VisionConfig) -> Result<Self> {
        Self::with_api_key(config, resolve_secret(&config.resolved_api_key_env())?)
    }

    pub fn with_api_key(config: &VisionConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: http::endpoint(&config.resolved_url(), "/v1/chat/completions")?,
            api_key,
            model: config.resolved_model(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl VisualAnalyzer for OpenAiVision {
    async fn describe(&self, image: &MediaAsset) -> Result<String> {
        let data_uri = format!("data:{};base64,{}", image.mime, encode(image).await?);
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ANALYSIS_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_uri } }
                ]
            }]
        });

        let request = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatResponse =
            http::send_json(request, "OpenAI vision", Error::Extraction).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Extraction("OpenAI vision returned no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisionProvider;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(provider: VisionProvider, url: &str) -> VisionConfig {
        VisionConfig {
            provider,
            url: Some(url.to_string()),
            model: Some("vision-test".to_string()),
            api_key_env: None,
            max_tokens: 256,
            timeout_secs: 5,
        }
    }

    fn image(tmp: &TempDir) -> MediaAsset {
        let path = tmp.path().join("chart.png");
        std::fs::write(&path, b"png-bytes").unwrap();
        MediaAsset::from_path(path)
    }

    #[tokio::test]
    async fn test_anthropic_sends_base64_image_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "model": "vision-test",
                "messages": [{"role": "user", "content": [{
                    "type": "image",
                    "source": {"type": "base64", "media_type": "image/png", "data": STANDARD.encode(b"png-bytes")}
                }]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "A bar chart of enzyme activity"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let vision = AnthropicVision::with_api_key(
            &config(VisionProvider::Anthropic, &server.uri()),
            "sk-test".to_string(),
        )
        .unwrap();
        let text = vision.describe(&image(&tmp)).await.unwrap();
        assert_eq!(text, "A bar chart of enzyme activity");
    }

    #[tokio::test]
    async fn test_openai_uses_data_uri() {
        let server = MockServer::start().await;
        let data_uri = format!("data:image/png;base64,{}", STANDARD.encode(b"png-bytes"));
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "messages": [{"content": [
                    {"type": "text"},
                    {"type": "image_url", "image_url": {"url": data_uri}}
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "A cell diagram"}}]
            })))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let vision = OpenAiVision::with_api_key(
            &config(VisionProvider::Openai, &server.uri()),
            "sk-test".to_string(),
        )
        .unwrap();
        assert_eq!(vision.describe(&image(&tmp)).await.unwrap(), "A cell diagram");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let vision = AnthropicVision::with_api_key(
            &config(VisionProvider::Anthropic, &server.uri()),
            "sk-test".to_string(),
        )
        .unwrap();
        let err = vision.describe(&image(&tmp)).await.unwrap_err();
        assert!(matches!(err, Error::Extraction(msg) if msg.contains("overloaded")));
    }
}
