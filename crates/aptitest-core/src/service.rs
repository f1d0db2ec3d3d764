//! Assessment orchestration.
//!
//! Combines the static bank, the generation pipeline, the scoring engine and
//! result persistence into the operations a host exposes to users.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::bank::sample_questions;
use crate::client::{GenerationClient, GenerationRequest, DEFAULT_MAX_RETRIES};
use crate::error::PipelineError;
use crate::extract::{extract_json_array, parse_json_array};
use crate::model::{AnswerSubmission, AssessmentResult, Question};
use crate::scoring::score;
use crate::shuffle::shuffle_options;
use crate::store::sort_newest_first;
use crate::traits::{QuestionBank, ResultStore};
use crate::validate::{validate_items, DEFAULT_REQUIRED_COUNT};

/// Prefix given to generated question ids in a merged test.
pub const AI_ID_PREFIX: &str = "ai-";

/// Configuration for the assessment service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Valid AI questions a generation batch must yield.
    pub required_ai_questions: usize,
    /// Output token limit for question generation.
    pub ai_max_output_tokens: u32,
    /// Attempt budget per generation request.
    pub max_retries: u32,
    /// Maximum concurrent generation requests in a batch.
    pub parallelism: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            required_ai_questions: DEFAULT_REQUIRED_COUNT,
            ai_max_output_tokens: 2000,
            max_retries: DEFAULT_MAX_RETRIES,
            parallelism: 4,
        }
    }
}

/// Prompt used to generate AI questions for a topic.
pub fn question_prompt(topic: &str, count: usize) -> String {
    format!(
        r#"Create {count} challenging {topic} test questions.

IMPORTANT: Write ALL math in plain text. NO LaTeX, NO dollar signs, NO special notation.
Examples:
- Write "2/3" NOT "$\frac{{2}}{{3}}$"
- Write "x^2" NOT "$x^2$"
- Write "sqrt(16)" NOT "$\sqrt{{16}}$"

Return ONLY this JSON array (no explanations):
[
  {{
    "question": "plain text question here",
    "options": ["A", "B", "C", "D"],
    "correctAnswer": 0,
    "explanation": "why the answer is correct"
  }}
]

Topic: {topic}"#
    )
}

/// The assessment service.
pub struct AssessmentService {
    bank: Arc<dyn QuestionBank>,
    generator: Option<Arc<GenerationClient>>,
    store: Arc<dyn ResultStore>,
    config: ServiceConfig,
}

impl AssessmentService {
    pub fn new(
        bank: Arc<dyn QuestionBank>,
        store: Arc<dyn ResultStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            bank,
            generator: None,
            store,
            config,
        }
    }

    /// Enable AI question generation.
    pub fn with_generator(mut self, client: GenerationClient) -> Self {
        self.generator = Some(Arc::new(client));
        self
    }

    /// Up to `count` bank questions for `topic`, each with shuffled options.
    pub fn random_questions(&self, topic: &str, count: usize) -> Vec<Question> {
        let all = self.bank.load(topic);
        if all.is_empty() {
            tracing::warn!("no bank questions for topic '{topic}'");
            return Vec::new();
        }
        sample_questions(&all, count, &mut rand::rng())
    }

    /// Generate validated AI questions for `topic`.
    ///
    /// Any failure along the pipeline is returned as-is; no placeholder
    /// questions are ever substituted.
    pub async fn ai_questions(&self, topic: &str) -> Result<Vec<Question>, PipelineError> {
        let Some(client) = &self.generator else {
            return Err(PipelineError::GenerationUnavailable {
                attempts: 0,
                reason: "no generation provider configured".into(),
            });
        };

        let request = GenerationRequest {
            max_output_tokens: self.config.ai_max_output_tokens,
            json_mode: true,
            max_retries: self.config.max_retries,
            ..GenerationRequest::new(question_prompt(topic, self.config.required_ai_questions))
        };

        let generated = client.generate(&request).await?;
        tracing::debug!(
            truncated = generated.truncated,
            "raw response ({} chars): {}",
            generated.text.len(),
            preview(&generated.text, 200)
        );

        let json = extract_json_array(&generated.text).inspect_err(|_| {
            tracing::warn!("no JSON array found in response for topic '{topic}'");
        })?;
        let items = parse_json_array(&json).inspect_err(|e| {
            tracing::warn!("{e}; content: {}", preview(&json, 500));
        })?;
        let questions = validate_items(&items, self.config.required_ai_questions)?;

        tracing::info!(
            provider = client.provider_name(),
            "generated {} AI questions for '{topic}'",
            questions.len()
        );
        Ok(questions)
    }

    /// Generate AI questions for several topics concurrently.
    ///
    /// Results come back in the order of `topics`.
    pub async fn ai_questions_for_topics(
        &self,
        topics: &[String],
    ) -> Vec<(String, Result<Vec<Question>, PipelineError>)> {
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for (index, topic) in topics.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => self.ai_questions(topic).await,
                    Err(_) => Err(PipelineError::GenerationUnavailable {
                        attempts: 0,
                        reason: "semaphore closed".into(),
                    }),
                };
                (index, topic.clone(), result)
            });
        }

        let mut outcomes = Vec::with_capacity(topics.len());
        while let Some(outcome) = futures.next().await {
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|(index, _, _)| *index);
        outcomes
            .into_iter()
            .map(|(_, topic, result)| (topic, result))
            .collect()
    }

    /// Assemble a test: `bank_count` bank questions, then (optionally) the AI
    /// batch with shuffled options. An AI failure fails the whole build.
    ///
    /// Generated ids carry the `ai-` prefix to keep them apart from bank ids
    /// in keyed submissions.
    pub async fn build_test(
        &self,
        topic: &str,
        bank_count: usize,
        include_ai: bool,
    ) -> Result<Vec<Question>, PipelineError> {
        let mut questions = self.random_questions(topic, bank_count);
        if include_ai {
            let generated = self.ai_questions(topic).await?;
            questions.extend(generated.iter().map(|q| {
                let mut q = shuffle_options(q);
                q.id = format!("{AI_ID_PREFIX}{}", q.id);
                q
            }));
        }
        Ok(questions)
    }

    /// Score a submission and persist the result.
    ///
    /// Persistence failures are logged and swallowed; the result is always
    /// returned.
    pub async fn submit(
        &self,
        user_id: &str,
        topic: &str,
        questions: &[Question],
        answers: &AnswerSubmission,
        time_taken_seconds: u64,
    ) -> AssessmentResult {
        let scorecard = score(questions, answers, time_taken_seconds);
        let result = AssessmentResult::new(user_id, topic, scorecard);

        match self.store.save(&result).await {
            Ok(()) => tracing::info!("assessment result saved: {}", result.id),
            Err(e) => tracing::error!("failed to save assessment result {}: {e:#}", result.id),
        }

        result
    }

    /// A user's past results, newest first.
    pub async fn history(&self, user_id: &str) -> anyhow::Result<Vec<AssessmentResult>> {
        let mut results = self.store.query_by_user(user_id).await?;
        sort_newest_first(&mut results);
        Ok(results)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
