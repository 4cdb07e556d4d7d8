//! Shared HTTP plumbing for embedding backends

use super::retry::{is_transient_status, AttemptError, BackoffPolicy};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub struct BackendClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    health_timeout: Duration,
    policy: BackoffPolicy,
    label: &'static str,
}

impl BackendClient {
    pub fn new(config: &EmbeddingConfig, api_key: Option<String>, label: &'static str) -> Result<Self> {
        let base_url = Url::parse(&config.resolved_url())
            .map_err(|e| Error::Config(format!("Invalid embedding backend URL: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            health_timeout: Duration::from_secs(config.health_timeout_secs),
            policy: BackoffPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.retry_delay_ms),
                config.backoff,
            ),
            label,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid embedding backend URL: {}", e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// `GET path` with the short health timeout; any non-2xx fails
    pub async fn check_health(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        let response = self
            .authorize(self.client.get(url.clone()))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| {
                Error::Embedding(format!("{} health check failed at {}: {}", self.label, url, e))
            })?;

        if !response.status().is_success() {
            return Err(Error::Embedding(format!(
                "{} health check failed at {}: status {}",
                self.label,
                url,
                response.status()
            )));
        }
        debug!("{} healthy at {}", self.label, url);
        Ok(())
    }

    /// `POST path` with a JSON body, retried on transient statuses
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        self.policy
            .run(self.label, |_| {
                let request = self.authorize(self.client.post(url.clone()).json(body));
                self.send_once(request)
            })
            .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<T, AttemptError> {
        let response = request.send().await.map_err(|e| {
            AttemptError::Fatal(Error::Embedding(format!("{} request failed: {}", self.label, e)))
        })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                AttemptError::Fatal(Error::Embedding(format!(
                    "{} returned an unreadable response: {}",
                    self.label, e
                )))
            });
        }

        let body = response.text().await.unwrap_or_default();
        let err = Error::Embedding(format!("{} returned {}: {}", self.label, status, body));
        if is_transient_status(status) {
            Err(AttemptError::Transient(err))
        } else {
            Err(AttemptError::Fatal(err))
        }
    }
}
