//! Trait definitions for the external collaborators of the core.
//!
//! `TextGenerator` is implemented by the `aptitest-providers` crate;
//! `QuestionBank` and `ResultStore` have filesystem and in-memory
//! implementations in [`crate::bank`] and [`crate::store`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::model::{AssessmentResult, Question};

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

/// Trait for generative text backends.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Issue a single completion request. No retries happen here.
    async fn complete(&self, request: &CompletionRequest) -> Result<RawResponse, ProviderError>;

    /// List the models this provider is known to serve.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// A single request to a text-generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (e.g. "gemini-2.0-flash-exp").
    pub model: String,
    /// The full prompt, including any JSON-mode instruction.
    pub prompt: String,
    /// Optional system instruction.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens the backend may generate.
    pub max_output_tokens: u32,
    /// Ask the backend for a JSON MIME type where it supports one.
    #[serde(default)]
    pub json_mode: bool,
}

/// Why a candidate stopped producing output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Other(String),
}

/// One candidate completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub finish_reason: FinishReason,
    /// Text parts in order. Providers drop non-text parts.
    #[serde(default)]
    pub parts: Vec<String>,
}

impl Candidate {
    /// Concatenate all text parts and trim surrounding whitespace.
    pub fn text(&self) -> String {
        self.parts.concat().trim().to_string()
    }
}

/// Provider-neutral view of a backend response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Set when the prompt itself was rejected and no candidates exist.
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl RawResponse {
    /// Convenience constructor for a single-candidate response.
    pub fn single(finish_reason: FinishReason, text: &str) -> Self {
        let parts = if text.is_empty() {
            vec![]
        } else {
            vec![text.to_string()]
        };
        Self {
            candidates: vec![Candidate {
                finish_reason,
                parts,
            }],
            block_reason: None,
        }
    }
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum output tokens per request.
    pub max_output_tokens: u32,
}

// ---------------------------------------------------------------------------
// Question bank and result persistence
// ---------------------------------------------------------------------------

/// Read-only source of curated questions.
pub trait QuestionBank: Send + Sync {
    /// Load every question for `topic`. Read or parse failures yield an
    /// empty list; they never reach the caller as errors.
    fn load(&self, topic: &str) -> Vec<Question>;
}

/// Append-only storage for assessment results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persist a result.
    async fn save(&self, result: &AssessmentResult) -> anyhow::Result<()>;

    /// All results for `user_id`, in no particular order.
    async fn query_by_user(&self, user_id: &str) -> anyhow::Result<Vec<AssessmentResult>>;
}
