//! Single-turn text generation agents

use crate::config::{resolve_secret, GenerationConfig, GenerationProvider};
use crate::error::{Error, Result};
use crate::http;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One prompt in, one completion out
#[async_trait]
pub trait GenerationAgent: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    fn model_name(&self) -> &str;
}

pub fn create_agent(config: &GenerationConfig) -> Result<Box<dyn GenerationAgent>> {
    let api_key = resolve_secret(&config.resolved_api_key_env())?;
    Ok(match config.provider {
        GenerationProvider::Anthropic => Box::new(AnthropicAgent::new(config, api_key)?),
        GenerationProvider::Gemini => Box::new(GeminiAgent::new(config, api_key)?),
        GenerationProvider::Openai => Box::new(OpenAiAgent::new(config, api_key)?),
    })
}

/// Anthropic Messages API
pub struct AnthropicAgent {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<TextBlock>,
}

#[derive(Debug, Deserialize)]
struct TextBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicAgent {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: http::endpoint(&config.resolved_url(), "/v1/messages")?,
            api_key,
            model: config.resolved_model(),
        })
    }
}

#[async_trait]
impl GenerationAgent for AnthropicAgent {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": prompt }]
        });
        let request = self
            .client
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let response: MessagesResponse =
            http::send_json(request, "Anthropic", Error::Generation).await?;
        Ok(response.content.into_iter().filter_map(|b| b.text).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Google Gemini `generateContent`
pub struct GeminiAgent {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextBlock>,
}

impl GeminiAgent {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        let model = config.resolved_model();
        let path = format!("/v1beta/models/{}:generateContent", model);
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: http::endpoint(&config.resolved_url(), &path)?,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl GenerationAgent for GeminiAgent {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": max_tokens }
        });
        let request = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response: GenerateContentResponse =
            http::send_json(request, "Gemini", Error::Generation).await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Generation("Gemini returned no candidates".to_string()))?;
        Ok(candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible chat completions
pub struct OpenAiAgent {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
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

impl OpenAiAgent {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: http::endpoint(&config.resolved_url(), "/v1/chat/completions")?,
            api_key,
            model: config.resolved_model(),
        })
    }
}

#[async_trait]
impl GenerationAgent for OpenAiAgent {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": prompt }]
        });
        let request = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatResponse = http::send_json(request, "OpenAI", Error::Generation).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Generation("OpenAI returned no choices".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(provider: GenerationProvider, url: &str) -> GenerationConfig {
        GenerationConfig {
            provider,
            url: Some(url.to_string()),
            model: Some("gen-test".to_string()),
            api_key_env: None,
            max_tokens: 1500,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_anthropic_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "key"))
            .and(body_partial_json(json!({"model": "gen-test", "max_tokens": 200})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Photosynthesis converts light."}]
            })))
            .mount(&server)
            .await;

        let agent =
            AnthropicAgent::new(&config(GenerationProvider::Anthropic, &server.uri()), "key".into())
                .unwrap();
        assert_eq!(
            agent.complete("Summarize", 200).await.unwrap(),
            "Photosynthesis converts light."
        );
    }

    #[tokio::test]
    async fn test_gemini_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gen-test:generateContent"))
            .and(header("x-goog-api-key", "key"))
            .and(body_partial_json(json!({"generationConfig": {"maxOutputTokens": 300}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "[1, "}, {"text": "2]"}]}}]
            })))
            .mount(&server)
            .await;

        let agent =
            GeminiAgent::new(&config(GenerationProvider::Gemini, &server.uri()), "key".into())
                .unwrap();
        assert_eq!(agent.complete("Questions", 300).await.unwrap(), "[1, 2]");
    }

    #[tokio::test]
    async fn test_openai_failure_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(1)
            .mount(&server)
            .await;

        let agent =
            OpenAiAgent::new(&config(GenerationProvider::Openai, &server.uri()), "key".into())
                .unwrap();
        let err = agent.complete("Plan", 100).await.unwrap_err();
        assert!(matches!(err, Error::Generation(msg) if msg.contains("429")));
    }
}
