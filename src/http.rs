//! Request helpers shared by the vision, speech and generation clients

use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// HTTP client with a whole-request timeout
pub(crate) fn client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Join an absolute API path onto a configured base URL
pub(crate) fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    Url::parse(base_url)
        .and_then(|base| base.join(path))
        .map_err(|e| Error::Config(format!("Invalid service URL {}: {}", base_url, e)))
}

/// Send `request` and decode a JSON body, wrapping every failure with `wrap`
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    label: &str,
    wrap: fn(String) -> Error,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| wrap(format!("{} request failed: {}", label, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(wrap(format!("{} returned {}: {}", label, status, body)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| wrap(format!("{} returned an unreadable response: {}", label, e)))
}
