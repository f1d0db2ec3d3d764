//! HTTP plumbing shared by the REST providers.

use std::time::Duration;

use aptitest_core::error::ProviderError;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub(crate) fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("failed to build HTTP client with timeout, using defaults: {e}");
            reqwest::Client::new()
        })
}

pub(crate) fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
    } else {
        ProviderError::NetworkError(e.to_string())
    }
}

/// Map non-success statuses to provider errors and return the body text of
/// successful responses.
///
/// `error_message` extracts a human-readable message from a provider error
/// body, falling back to the raw body.
pub(crate) async fn read_body(
    response: reqwest::Response,
    model: &str,
    error_message: fn(&str) -> Option<String>,
) -> Result<String, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            .saturating_mul(1000);
        return Err(ProviderError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    let body = response.text().await.map_err(send_error)?;

    match status {
        401 | 403 => Err(ProviderError::AuthenticationFailed(
            error_message(&body).unwrap_or(body),
        )),
        404 => Err(ProviderError::ModelNotFound(model.to_string())),
        s if s >= 400 => Err(ProviderError::ApiError {
            status,
            message: error_message(&body).unwrap_or(body),
        }),
        _ => Ok(body),
    }
}

pub(crate) fn parse_error(e: serde_json::Error) -> ProviderError {
    ProviderError::ApiError {
        status: 0,
        message: format!("failed to parse response: {e}"),
    }
}
