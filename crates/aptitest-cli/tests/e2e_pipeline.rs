//! End-to-end pipeline tests: provider → generation client → extraction →
//! validation → scoring → persistence, with an offline generator.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aptitest_core::bank::FileQuestionBank;
use aptitest_core::client::{GenerationClient, GenerationConfig};
use aptitest_core::model::{AnswerSubmission, AnswerStatus, PerformanceLevel};
use aptitest_core::service::{AssessmentService, ServiceConfig};
use aptitest_core::store::JsonFileStore;
use aptitest_core::traits::{FinishReason, RawResponse};
use aptitest_core::{PipelineError, ProviderError};
use aptitest_providers::mock::MockGenerator;

const VALID_BATCH: &str = r#"[
  {"question": "What is 12 / 4?", "options": ["2", "3", "4", "6"], "correctAnswer": 1, "explanation": "12 / 4 = 3"},
  {"question": "What is 7 + 8?", "options": ["14", "15", "16", "13"], "correctAnswer": 1, "explanation": "7 + 8 = 15"},
  {"question": "What is 9^2?", "options": ["18", "81", "72", "99"], "correctAnswer": 1, "explanation": "9 * 9 = 81"}
]"#;

fn bank_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../data"))
}

fn service_with(
    generator: Arc<MockGenerator>,
    results: &Path,
    max_retries: u32,
) -> AssessmentService {
    let config = ServiceConfig {
        max_retries,
        ..ServiceConfig::default()
    };
    let client = GenerationClient::new(
        generator,
        GenerationConfig {
            backoff_unit: Duration::from_millis(100),
            ..GenerationConfig::default()
        },
    );
    AssessmentService::new(
        Arc::new(FileQuestionBank::new(bank_dir())),
        Arc::new(JsonFileStore::new(results)),
        config,
    )
    .with_generator(client)
}

#[tokio::test]
async fn e2e_generate_take_and_score_a_test() {
    let results = tempfile::tempdir().unwrap();
    let generator = Arc::new(MockGenerator::with_fixed_response(VALID_BATCH));
    let service = service_with(Arc::clone(&generator), results.path(), 3);

    let questions = service.build_test("quantitative", 3, true).await.unwrap();
    assert_eq!(questions.len(), 6);
    assert_eq!(generator.call_count(), 1);

    let request = generator.last_request().unwrap();
    assert!(request.json_mode);
    assert_eq!(request.max_output_tokens, 2000);
    assert!(request.prompt.contains("quantitative"));

    // Answer every question correctly except the last, which is skipped.
    let mut answers: Vec<Option<i64>> = questions
        .iter()
        .map(|q| Some(q.correct_answer_index as i64))
        .collect();
    answers[5] = None;

    let result = service
        .submit(
            "student-1",
            "quantitative",
            &questions,
            &AnswerSubmission::Positional(answers),
            600,
        )
        .await;

    assert_eq!(result.scorecard.correct_count, 5);
    assert_eq!(result.scorecard.unanswered_count, 1);
    assert_eq!(result.scorecard.score_percent, 83);
    assert_eq!(result.scorecard.performance_level, PerformanceLevel::VeryGood);
    assert_eq!(result.scorecard.completion_metrics.time_taken_minutes, 10);
    assert!(!result.scorecard.completion_metrics.is_fully_completed);
    assert_eq!(
        result.scorecard.breakdown[5].status,
        AnswerStatus::Unanswered
    );

    let history = service.history("student-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], result);
}

#[tokio::test(start_paused = true)]
async fn e2e_transient_failures_are_retried() {
    let results = tempfile::tempdir().unwrap();
    let generator = Arc::new(MockGenerator::with_fixed_response(VALID_BATCH).with_script(vec![
        Err(ProviderError::NetworkError("connection reset".into())),
        Ok(RawResponse::single(FinishReason::Stop, "")),
    ]));
    let service = service_with(Arc::clone(&generator), results.path(), 3);

    let start = tokio::time::Instant::now();
    let questions = service.ai_questions("ratios").await.unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(generator.call_count(), 3);
    // 100ms after the first failure, 200ms after the second.
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn e2e_exhausted_retries_surface_as_unavailable() {
    let results = tempfile::tempdir().unwrap();
    let prompt_blocked = || -> Result<RawResponse, ProviderError> {
        Ok(RawResponse {
            candidates: vec![],
            block_reason: Some("SAFETY".into()),
        })
    };
    let generator = Arc::new(MockGenerator::with_fixed_response(VALID_BATCH).with_script(vec![
        prompt_blocked(),
        Ok(RawResponse::single(FinishReason::Safety, "")),
        prompt_blocked(),
        prompt_blocked(),
    ]));
    let service = service_with(Arc::clone(&generator), results.path(), 2);

    let err = service.ai_questions("ratios").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::GenerationUnavailable { attempts: 2, .. }
    ));

    // A failed AI batch fails the whole test, with no placeholder questions.
    let err = service.build_test("ratios", 5, true).await.unwrap_err();
    assert!(matches!(err, PipelineError::GenerationUnavailable { .. }));
}

#[tokio::test]
async fn e2e_truncated_batch_below_minimum_is_rejected() {
    let results = tempfile::tempdir().unwrap();
    let truncated = r#"[
      {"question": "What is 1 + 1?", "options": ["1", "2", "3", "4"], "correctAnswer": 1},
      {"question": "What is 2 + 2?", "options": ["4", "5"], "correctAnswer": 0}
    ]"#;
    let generator = Arc::new(
        MockGenerator::with_fixed_response(VALID_BATCH)
            .with_script(vec![Ok(RawResponse::single(FinishReason::MaxTokens, truncated))]),
    );
    let service = service_with(Arc::clone(&generator), results.path(), 3);

    let err = service.ai_questions("arithmetic").await.unwrap_err();
    assert_eq!(
        err,
        PipelineError::InsufficientValidItems {
            found: 1,
            required: 3
        }
    );
    // Partial text is used as-is; the client does not retry it.
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn e2e_batch_generation_keeps_topic_order() {
    let results = tempfile::tempdir().unwrap();
    let mut responses = HashMap::new();
    responses.insert("Topic: geometry".to_string(), "no questions today".to_string());
    let generator = Arc::new(MockGenerator::new(responses).with_delay(Duration::from_millis(5)));

    // Unmatched prompts fall back to the default "[]", which is too short.
    let service = service_with(Arc::clone(&generator), results.path(), 1);
    let topics: Vec<String> = ["algebra", "geometry", "series"]
        .iter()
        .map(|t| t.to_string())
        .collect();

    let outcomes = service.ai_questions_for_topics(&topics).await;
    let names: Vec<&str> = outcomes.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(names, ["algebra", "geometry", "series"]);
    assert_eq!(
        outcomes[0].1,
        Err(PipelineError::InsufficientValidItems {
            found: 0,
            required: 3
        })
    );
    assert_eq!(outcomes[1].1, Err(PipelineError::NoArrayFound));
    assert_eq!(generator.call_count(), 3);
}
