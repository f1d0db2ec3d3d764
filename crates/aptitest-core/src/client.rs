//! Resilient generation client.
//!
//! Wraps a [`TextGenerator`] with bounded retries and exponential backoff.
//! Every backend response is classified into an [`Outcome`] before the retry
//! loop decides what to do with it, so truncation, safety blocks and empty
//! candidates are handled as values rather than exceptions.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::instrument;

use crate::error::{PipelineError, ProviderError};
use crate::extract::strip_code_fence;
use crate::traits::{CompletionRequest, FinishReason, RawResponse, TextGenerator};

/// Instruction appended to prompts in JSON mode.
pub const JSON_MODE_INSTRUCTION: &str =
    "Respond with ONLY valid JSON, no markdown formatting or code blocks.";

/// Default attempt budget per request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default output token limit per request.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// Temperature used for structured JSON generation.
pub const STRUCTURED_JSON_TEMPERATURE: f64 = 0.3;

/// Client-wide generation settings.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Default sampling temperature.
    pub temperature: f64,
    /// Backoff unit; attempt `n` (0-based) waits `unit * 2^n` before retrying.
    pub backoff_unit: Duration,
    /// Optional system instruction sent with every request.
    pub system_prompt: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.7,
            backoff_unit: Duration::from_secs(1),
            system_prompt: None,
        }
    }
}

/// A single generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_output_tokens: u32,
    pub json_mode: bool,
    /// Attempt budget; values below 1 are treated as 1.
    pub max_retries: u32,
    /// Overrides the client's default temperature.
    pub temperature: Option<f64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            json_mode: false,
            max_retries: DEFAULT_MAX_RETRIES,
            temperature: None,
        }
    }
}

/// Text returned by a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    pub text: String,
    /// The backend stopped at the token limit; `text` is a prefix.
    pub truncated: bool,
    /// Attempts consumed, including the successful one.
    pub attempts: u32,
}

/// Classification of a single backend response.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Normal completion with text.
    Complete(String),
    /// Stopped at the token limit with usable partial text.
    Partial(String),
    /// Normal completion with no text.
    Empty,
    /// Stopped at the token limit before producing any text.
    TruncatedEmpty,
    /// Rejected by a content policy.
    Blocked(String),
    /// The backend returned no candidates at all.
    NoResult,
    /// The request itself failed.
    TransportError(ProviderError),
}

impl Outcome {
    /// Classify a provider response. Only the first candidate is inspected.
    pub fn classify(response: &RawResponse) -> Self {
        let Some(candidate) = response.candidates.first() else {
            return match &response.block_reason {
                Some(reason) => Outcome::Blocked(reason.clone()),
                None => Outcome::NoResult,
            };
        };

        let text = candidate.text();
        match &candidate.finish_reason {
            FinishReason::Safety => Outcome::Blocked("safety".to_string()),
            FinishReason::MaxTokens if text.is_empty() => Outcome::TruncatedEmpty,
            FinishReason::MaxTokens => Outcome::Partial(text),
            _ if text.is_empty() => Outcome::Empty,
            _ => Outcome::Complete(text),
        }
    }

    /// Whether this outcome should consume another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Outcome::Complete(_) | Outcome::Partial(_) => false,
            Outcome::TransportError(e) => !e.is_permanent(),
            _ => true,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Complete(text) => write!(f, "complete ({} chars)", text.len()),
            Outcome::Partial(text) => write!(f, "truncated ({} chars)", text.len()),
            Outcome::Empty => write!(f, "empty response"),
            Outcome::TruncatedEmpty => write!(f, "truncated at max tokens with no text"),
            Outcome::Blocked(reason) => write!(f, "blocked by content policy ({reason})"),
            Outcome::NoResult => write!(f, "no candidates returned"),
            Outcome::TransportError(e) => write!(f, "{e}"),
        }
    }
}

/// Generation client with retry and backoff.
pub struct GenerationClient {
    generator: Arc<dyn TextGenerator>,
    config: GenerationConfig,
}

impl GenerationClient {
    pub fn new(generator: Arc<dyn TextGenerator>, config: GenerationConfig) -> Self {
        Self { generator, config }
    }

    /// Name of the underlying provider.
    pub fn provider_name(&self) -> &str {
        self.generator.name()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate text, retrying empty, blocked and failed responses.
    ///
    /// A truncated response that still carries text is returned immediately
    /// with `truncated` set; it does not consume further attempts.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedText, PipelineError> {
        self.generate_counted(request, &AtomicU32::new(0)).await
    }

    /// The retry loop. `started` holds the number of attempts begun so far.
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn generate_counted(
        &self,
        request: &GenerationRequest,
        started: &AtomicU32,
    ) -> Result<GeneratedText, PipelineError> {
        let prompt = if request.json_mode {
            format!("{}\n\n{}", request.prompt, JSON_MODE_INSTRUCTION)
        } else {
            request.prompt.clone()
        };

        let completion = CompletionRequest {
            model: self.config.model.clone(),
            prompt,
            system_prompt: self.config.system_prompt.clone(),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_output_tokens: request.max_output_tokens,
            json_mode: request.json_mode,
        };

        let max_attempts = request.max_retries.max(1);
        let mut last_outcome = Outcome::NoResult;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let hint = match &last_outcome {
                    Outcome::TransportError(e) => e.retry_after_ms(),
                    _ => None,
                };
                tokio::time::sleep(self.backoff_delay(attempt - 1, hint)).await;
            }

            started.store(attempt + 1, Ordering::Relaxed);
            let outcome = match self.generator.complete(&completion).await {
                Ok(response) => Outcome::classify(&response),
                Err(e) => Outcome::TransportError(e),
            };

            match outcome {
                Outcome::Complete(text) => {
                    tracing::info!(
                        attempt = attempt + 1,
                        chars = text.len(),
                        "generation complete"
                    );
                    return Ok(GeneratedText {
                        text,
                        truncated: false,
                        attempts: attempt + 1,
                    });
                }
                Outcome::Partial(text) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        chars = text.len(),
                        "response truncated at max tokens, using partial text"
                    );
                    return Ok(GeneratedText {
                        text,
                        truncated: true,
                        attempts: attempt + 1,
                    });
                }
                other if !other.is_retryable() => {
                    tracing::error!("generation failed permanently: {other}");
                    return Err(PipelineError::GenerationUnavailable {
                        attempts: attempt + 1,
                        reason: other.to_string(),
                    });
                }
                other => {
                    tracing::warn!(
                        "generation attempt {}/{} failed: {other}",
                        attempt + 1,
                        max_attempts
                    );
                    last_outcome = other;
                }
            }
        }

        tracing::error!("all {max_attempts} generation attempts failed");
        Err(PipelineError::GenerationUnavailable {
            attempts: max_attempts,
            reason: last_outcome.to_string(),
        })
    }

    /// [`generate`](Self::generate) bounded by an overall deadline.
    ///
    /// Hitting the deadline is reported the same way as exhausting retries,
    /// with `attempts` set to the number of attempts started before it.
    pub async fn generate_within(
        &self,
        request: &GenerationRequest,
        deadline: Duration,
    ) -> Result<GeneratedText, PipelineError> {
        let started = AtomicU32::new(0);
        match tokio::time::timeout(deadline, self.generate_counted(request, &started)).await {
            Ok(result) => result,
            Err(_) => {
                let attempts = started.load(Ordering::Relaxed);
                tracing::error!(attempts, "generation deadline of {deadline:?} exceeded");
                Err(PipelineError::GenerationUnavailable {
                    attempts,
                    reason: format!("deadline of {}ms exceeded", deadline.as_millis()),
                })
            }
        }
    }

    /// Generate a JSON document and parse it.
    pub async fn generate_json(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<Value, PipelineError> {
        let request = GenerationRequest {
            max_output_tokens,
            json_mode: true,
            temperature: Some(STRUCTURED_JSON_TEMPERATURE),
            ..GenerationRequest::new(prompt)
        };
        let generated = self.generate(&request).await?;
        let cleaned = strip_code_fence(&generated.text);
        serde_json::from_str(&cleaned).map_err(|e| {
            tracing::warn!("JSON parse error: {e}");
            PipelineError::MalformedJson(e.to_string())
        })
    }

    fn backoff_delay(&self, failed_attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        let exponential = self
            .config
            .backoff_unit
            .saturating_mul(1u32 << failed_attempt.min(16));
        match retry_after_ms {
            Some(ms) => exponential.max(Duration::from_millis(ms)),
            None => exponential,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::traits::{Candidate, ModelInfo};

    /// Replays a fixed script of responses, then returns empty responses.
    pub(crate) struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<RawResponse, ProviderError>>>,
        calls: AtomicU32,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn new(script: Vec<Result<RawResponse, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
                last_request: Mutex::new(None),
            }
        }

        pub(crate) fn calls(&self) -> u32 {
            self.calls.load(Ordering::Relaxed)
        }

        fn last_request(&self) -> Option<CompletionRequest> {
            self.last_request.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<RawResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            *self.last_request.lock().unwrap() = Some(request.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(RawResponse::default()))
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    fn client(generator: &Arc<ScriptedGenerator>) -> GenerationClient {
        GenerationClient::new(generator.clone(), GenerationConfig::default())
    }

    fn stop(text: &str) -> Result<RawResponse, ProviderError> {
        Ok(RawResponse::single(FinishReason::Stop, text))
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_complete_response() {
        let generator = Arc::new(ScriptedGenerator::new(vec![stop("  hello  ")]));
        let out = client(&generator)
            .generate(&GenerationRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(out.text, "hello");
        assert!(!out.truncated);
        assert_eq!(out.attempts, 1);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_text_short_circuits_retries() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(RawResponse::single(FinishReason::MaxTokens, "[{\"question\": ")),
            stop("never reached"),
        ]));
        let out = client(&generator)
            .generate(&GenerationRequest::new("hi"))
            .await
            .unwrap();
        assert!(out.truncated);
        assert_eq!(out.text, "[{\"question\":");
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_empty_and_blocked_with_backoff() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            stop(""),
            Ok(RawResponse::single(FinishReason::Safety, "partial unsafe")),
            stop("finally"),
        ]));
        let start = Instant::now();
        let out = client(&generator)
            .generate(&GenerationRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(out.text, "finally");
        assert_eq!(out.attempts, 3);
        assert_eq!(generator.calls(), 3);
        // 1s after the first failure, 2s after the second.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_fail_with_last_reason() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(ProviderError::NetworkError("reset".into())),
            Ok(RawResponse::single(FinishReason::MaxTokens, "")),
            Ok(RawResponse {
                candidates: vec![],
                block_reason: Some("PROHIBITED_CONTENT".into()),
            }),
        ]));
        let err = client(&generator)
            .generate(&GenerationRequest::new("hi"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::GenerationUnavailable {
                attempts: 3,
                reason: "blocked by content policy (PROHIBITED_CONTENT)".into()
            }
        );
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_stop_immediately() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(
            ProviderError::NotConfigured("gemini".into()),
        )]));
        let err = client(&generator)
            .generate(&GenerationRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::GenerationUnavailable { attempts: 1, .. }
        ));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hint_extends_backoff() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(ProviderError::RateLimited {
                retry_after_ms: 5000,
            }),
            stop("ok"),
        ]));
        let start = Instant::now();
        client(&generator)
            .generate(&GenerationRequest::new("hi"))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_still_makes_one_attempt() {
        let generator = Arc::new(ScriptedGenerator::new(vec![stop("")]));
        let request = GenerationRequest {
            max_retries: 0,
            ..GenerationRequest::new("hi")
        };
        let err = client(&generator).generate(&request).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::GenerationUnavailable { attempts: 1, .. }
        ));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn json_mode_appends_instruction() {
        let generator = Arc::new(ScriptedGenerator::new(vec![stop("[]")]));
        let request = GenerationRequest {
            json_mode: true,
            max_output_tokens: 2000,
            ..GenerationRequest::new("list things")
        };
        client(&generator).generate(&request).await.unwrap();
        let sent = generator.last_request().unwrap();
        assert!(sent.json_mode);
        assert_eq!(sent.max_output_tokens, 2000);
        assert!(sent.prompt.starts_with("list things"));
        assert!(sent.prompt.ends_with(JSON_MODE_INSTRUCTION));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_as_exhaustion() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let err = client(&generator)
            .generate_within(&GenerationRequest::new("hi"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::GenerationUnavailable { attempts: 2, .. }
        ));
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_reports_attempts_actually_made() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let request = GenerationRequest {
            max_retries: 5,
            ..GenerationRequest::new("hi")
        };
        let err = client(&generator)
            .generate_within(&request, Duration::from_millis(500))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::GenerationUnavailable {
                attempts: 1,
                reason: "deadline of 500ms exceeded".into(),
            }
        );
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_json_strips_fences() {
        let generator = Arc::new(ScriptedGenerator::new(vec![stop(
            "```json\n{\"skills\": [\"rust\"]}\n```",
        )]));
        let client = client(&generator);
        let value = client.generate_json("describe", 512).await.unwrap();
        assert_eq!(value["skills"][0], "rust");
        assert_eq!(
            generator.last_request().unwrap().temperature,
            STRUCTURED_JSON_TEMPERATURE
        );
    }

    #[tokio::test(start_paused = true)]
    async fn generate_json_reports_parse_failures() {
        let generator = Arc::new(ScriptedGenerator::new(vec![stop("not json at all")]));
        let err = client(&generator)
            .generate_json("describe", 512)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedJson(_)));
    }

    #[test]
    fn classify_covers_every_shape() {
        let multi_part = RawResponse {
            candidates: vec![Candidate {
                finish_reason: FinishReason::Stop,
                parts: vec!["[1,".into(), "2]".into()],
            }],
            block_reason: None,
        };
        assert!(matches!(Outcome::classify(&multi_part), Outcome::Complete(t) if t == "[1,2]"));
        assert!(matches!(
            Outcome::classify(&RawResponse::default()),
            Outcome::NoResult
        ));
        assert!(matches!(
            Outcome::classify(&RawResponse::single(FinishReason::Stop, "   ")),
            Outcome::Empty
        ));
        assert!(matches!(
            Outcome::classify(&RawResponse::single(
                FinishReason::Other("RECITATION".into()),
                "text"
            )),
            Outcome::Complete(_)
        ));
        assert!(matches!(
            Outcome::classify(&RawResponse::single(FinishReason::MaxTokens, "")),
            Outcome::TruncatedEmpty
        ));
    }
}
