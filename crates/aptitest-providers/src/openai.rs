//! OpenAI-compatible chat completions provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use aptitest_core::error::ProviderError;
use aptitest_core::traits::{
    Candidate, CompletionRequest, FinishReason, ModelInfo, RawResponse, TextGenerator,
};

use crate::http::{build_client, parse_error, read_body, send_error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible API provider.
///
/// `json_mode` is carried in the prompt only. The `json_object` response
/// format forces a top-level object, while question generation expects an
/// array.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, base_url: Option<String>, org_id: Option<String>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            client: build_client(),
        }
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OpenAiMessage>,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<OpenAiError>(body)
        .ok()
        .map(|e| e.error.message)
}

fn finish_reason(code: Option<&str>) -> FinishReason {
    match code {
        None | Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::MaxTokens,
        Some("content_filter") => FinishReason::Safety,
        Some(other) => FinishReason::Other(other.to_string()),
    }
}

impl From<OpenAiResponse> for RawResponse {
    fn from(response: OpenAiResponse) -> Self {
        RawResponse {
            candidates: response
                .choices
                .into_iter()
                .map(|choice| Candidate {
                    finish_reason: finish_reason(choice.finish_reason.as_deref()),
                    parts: choice
                        .message
                        .content
                        .filter(|c| !c.is_empty())
                        .into_iter()
                        .collect(),
                })
                .collect(),
            block_reason: None,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<RawResponse, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "OpenAI API key is not set".into(),
            ));
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OpenAiMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let body = OpenAiRequest {
            model: request.model.clone(),
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            messages,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.json(&body).send().await.map_err(send_error)?;
        let text = read_body(response, &request.model, error_message).await?;
        let parsed: OpenAiResponse = serde_json::from_str(&text).map_err(parse_error)?;
        Ok(parsed.into())
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4.1".into(),
                name: "GPT-4.1".into(),
                provider: "openai".into(),
                max_output_tokens: 32_768,
            },
            ModelInfo {
                id: "gpt-4.1-mini".into(),
                name: "GPT-4.1 Mini".into(),
                provider: "openai".into(),
                max_output_tokens: 32_768,
            },
        ]
    }
}
