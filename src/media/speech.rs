//! Speech to text through an OpenAI-compatible `/v1/audio/transcriptions`

use super::Transcriber;
use crate::config::{resolve_secret, TranscriptionConfig};
use crate::error::{Error, Result};
use crate::http;
use crate::models::MediaAsset;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub struct WhisperTranscriber {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Result<Self> {
        Self::with_api_key(config, resolve_secret(&config.api_key_env)?)
    }

    pub fn with_api_key(config: &TranscriptionConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            endpoint: http::endpoint(&config.url, "/v1/audio/transcriptions")?,
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &MediaAsset) -> Result<String> {
        let bytes = tokio::fs::read(&audio.path).await.map_err(|e| {
            Error::Extraction(format!("Failed to read audio {}: {}", audio.path.display(), e))
        })?;
        let part = Part::bytes(bytes)
            .file_name(audio.file_name())
            .mime_str(&audio.mime)
            .map_err(|e| Error::Extraction(format!("Invalid audio MIME type: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let request = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .multipart(form);
        let response: TranscriptionResponse =
            http::send_json(request, "Transcription", Error::Extraction).await?;

        debug!("Transcribed {} ({} chars)", audio.file_name(), response.text.len());
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: &str) -> TranscriptionConfig {
        TranscriptionConfig {
            url: url.to_string(),
            model: "whisper-1".to_string(),
            api_key_env: "STUDYRAG_TEST_UNSET_KEY".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_transcribe_posts_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "Today we cover glycolysis."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("audio.wav");
        std::fs::write(&file, b"RIFF").unwrap();

        let transcriber =
            WhisperTranscriber::with_api_key(&config(&server.uri()), "sk-test".to_string()).unwrap();
        let text = transcriber
            .transcribe(&MediaAsset::from_path(file))
            .await
            .unwrap();
        assert_eq!(text, "Today we cover glycolysis.");

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"model\""));
        assert!(body.contains("whisper-1"));
        assert!(body.contains("filename=\"audio.wav\""));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let result = WhisperTranscriber::new(&config("http://localhost:1"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
