//! Error types for the generation pipeline.
//!
//! `ProviderError` represents failures when talking to a text-generation
//! backend. It lives in `aptitest-core` so the generation client can classify
//! errors for retry decisions without string matching.
//!
//! `PipelineError` is the single terminal failure reported to callers of the
//! question-generation pipeline.

use thiserror::Error;

/// Errors that can occur when interacting with a text-generation provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// No API key (or endpoint) was configured for this provider.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::NotConfigured(_)
                | ProviderError::AuthenticationFailed(_)
                | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Terminal failures of the question-generation pipeline.
///
/// None of these are recovered with synthetic data: a caller receiving one
/// must report the generation feature as failed for that request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The service produced no usable text within the attempt budget.
    #[error("generation unavailable after {attempts} attempt(s): {reason}")]
    GenerationUnavailable { attempts: u32, reason: String },

    /// The response text contained no `[ ... ]` span.
    #[error("no JSON array found in response")]
    NoArrayFound,

    /// A JSON span was found but could not be parsed as an array.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// Too few generated items survived schema validation.
    #[error("only {found}/{required} valid questions generated")]
    InsufficientValidItems { found: usize, required: usize },
}
