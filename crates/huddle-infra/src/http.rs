//! Shared reqwest plumbing for backend clients.

use std::time::Duration;

use serde::de::DeserializeOwned;

use huddle_types::error::MemoryError;

/// Timeout applied to every backend request.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for batch embedding requests, which carry many texts.
pub(crate) const BATCH_EMBED_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn build_client() -> Result<reqwest::Client, MemoryError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| MemoryError::Config(format!("failed to create HTTP client: {e}")))
}

pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> MemoryError {
    if err.is_timeout() {
        MemoryError::Transport(format!("{provider} request timed out: {err}"))
    } else {
        MemoryError::Transport(format!("{provider} request failed: {err}"))
    }
}

/// Pass 2xx responses through; turn anything else into [`MemoryError::Http`]
/// carrying the response body.
pub(crate) async fn check_status(
    provider: &str,
    url: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, MemoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider = %provider, status = %status, body = %body, url = %url, "Backend error response");
    Err(MemoryError::Http {
        provider: provider.to_string(),
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T, MemoryError> {
    response
        .json()
        .await
        .map_err(|e| MemoryError::Deserialization(format!("failed to parse {provider} response: {e}")))
}
