//! Request helpers shared by the provider clients.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ProviderError;

/// Maximum number of characters of an error body kept in `ProviderError::Api`.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Send `request`, racing it against `cancel`, and reject non-2xx statuses.
pub(crate) async fn send(
    provider: &'static str,
    cancel: &CancellationToken,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ProviderError> {
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ProviderError::Cancelled { provider }),
        result = request.send() => result.map_err(|source| ProviderError::Http { provider, source })?,
    };

    let status = response.status();
    debug!("{} responded with {}", provider, status);
    if status.is_success() {
        return Ok(response);
    }

    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ProviderError::Cancelled { provider }),
        text = response.text() => text.unwrap_or_default(),
    };
    Err(ProviderError::Api {
        provider,
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}

/// Read the whole body and decode it as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    cancel: &CancellationToken,
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let bytes = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ProviderError::Cancelled { provider }),
        result = response.bytes() => result.map_err(|source| ProviderError::Http { provider, source })?,
    };

    serde_json::from_slice(&bytes).map_err(|e| ProviderError::InvalidResponse {
        provider,
        reason: e.to_string(),
    })
}
