//! Mock provider for tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use aptitest_core::error::ProviderError;
use aptitest_core::traits::{CompletionRequest, FinishReason, ModelInfo, RawResponse, TextGenerator};

/// A text generator that never leaves the process.
///
/// Responses are chosen in this order: the next scripted reply (if any),
/// the first prompt-substring match, then the default text.
pub struct MockGenerator {
    /// Map of prompt substring to response text.
    responses: HashMap<String, String>,
    default_response: String,
    script: Mutex<VecDeque<Result<RawResponse, ProviderError>>>,
    delay: Option<Duration>,
    call_count: AtomicU32,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockGenerator {
    /// Create a mock with prompt-substring to response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: "[]".to_string(),
            script: Mutex::new(VecDeque::new()),
            delay: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same text.
    pub fn with_fixed_response(response: &str) -> Self {
        let mut mock = Self::new(HashMap::new());
        mock.default_response = response.to_string();
        mock
    }

    /// Queue raw replies that are served before any text matching.
    pub fn with_script(self, script: Vec<Result<RawResponse, ProviderError>>) -> Self {
        if let Ok(mut queue) = self.script.lock() {
            queue.extend(script);
        }
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }

    fn next_scripted(&self) -> Option<Result<RawResponse, ProviderError>> {
        self.script.lock().ok().and_then(|mut q| q.pop_front())
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<RawResponse, ProviderError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reply) = self.next_scripted() {
            return reply;
        }

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.as_str())
            .unwrap_or(&self.default_response);

        Ok(RawResponse::single(FinishReason::Stop, content))
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_output_tokens: 100_000,
        }]
    }
}
