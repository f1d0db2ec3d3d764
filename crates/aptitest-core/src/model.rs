//! Core data model types for aptitest.
//!
//! Field names on the wire follow the question bank file format
//! (`question`, `options`, `correctAnswer`, ...), so bank files, generated
//! items and persisted results all share one JSON shape.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier; bank files may store it as a string or an integer.
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    /// The question prompt shown to the user.
    #[serde(rename = "question")]
    pub text: String,
    /// Answer options in presentation order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    #[serde(
        rename = "correctAnswer",
        alias = "correctAnswerIndex",
        default
    )]
    pub correct_answer_index: usize,
    /// Why the correct answer is correct.
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// The text of the correct option, if the index is in range.
    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .get(self.correct_answer_index)
            .map(String::as_str)
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// The answers a user submitted for one test attempt.
///
/// Clients send either a positional array (one slot per question, `null`
/// for unanswered) or a sparse object keyed by question id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerSubmission {
    Positional(Vec<Option<i64>>),
    Keyed(HashMap<String, Option<i64>>),
}

impl AnswerSubmission {
    /// Resolve the chosen option for the question at `position`.
    ///
    /// Keyed submissions are looked up by the question's id, falling back to
    /// the stringified position for questions without one.
    pub fn answer_for(&self, position: usize, question: &Question) -> Option<i64> {
        match self {
            AnswerSubmission::Positional(slots) => slots.get(position).copied().flatten(),
            AnswerSubmission::Keyed(map) => {
                let key = if question.id.is_empty() {
                    position.to_string()
                } else {
                    question.id.clone()
                };
                map.get(&key).copied().flatten()
            }
        }
    }
}

impl Default for AnswerSubmission {
    fn default() -> Self {
        AnswerSubmission::Positional(Vec::new())
    }
}

/// Grading status of a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Correct,
    Incorrect,
    Unanswered,
}

impl fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerStatus::Correct => write!(f, "correct"),
            AnswerStatus::Incorrect => write!(f, "incorrect"),
            AnswerStatus::Unanswered => write!(f, "unanswered"),
        }
    }
}

/// Per-question explanation of how an answer was graded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBreakdown {
    /// 1-based position in the test.
    pub question_number: usize,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub user_answer: Option<i64>,
    pub status: AnswerStatus,
    pub explanation: String,
}

/// How much of the test the user actually attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionMetrics {
    pub questions_answered: usize,
    pub total_questions: usize,
    pub completion_percentage: u32,
    pub time_taken_minutes: u64,
    pub is_fully_completed: bool,
}

/// Banded classification of a score percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceLevel {
    #[serde(rename = "Excellent")]
    Excellent,
    #[serde(rename = "Very Good")]
    VeryGood,
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl PerformanceLevel {
    /// Classify a score. Bands are checked top-down with inclusive lower
    /// bounds; the first match wins.
    pub fn from_score(score_percent: u32) -> Self {
        match score_percent {
            90.. => PerformanceLevel::Excellent,
            75.. => PerformanceLevel::VeryGood,
            60.. => PerformanceLevel::Good,
            50.. => PerformanceLevel::Average,
            _ => PerformanceLevel::NeedsImprovement,
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceLevel::Excellent => write!(f, "Excellent"),
            PerformanceLevel::VeryGood => write!(f, "Very Good"),
            PerformanceLevel::Good => write!(f, "Good"),
            PerformanceLevel::Average => write!(f, "Average"),
            PerformanceLevel::NeedsImprovement => write!(f, "Needs Improvement"),
        }
    }
}

/// Everything the scoring engine derives from one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    pub score_percent: u32,
    pub total_questions: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub unanswered_count: usize,
    pub time_taken_seconds: u64,
    pub performance_level: PerformanceLevel,
    pub completion_metrics: CompletionMetrics,
    pub breakdown: Vec<QuestionBreakdown>,
}

/// A scored, persisted test attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub id: Uuid,
    pub user_id: String,
    pub topic: String,
    #[serde(flatten)]
    pub scorecard: Scorecard,
    pub created_at: DateTime<Utc>,
}

impl AssessmentResult {
    /// Wrap a scorecard with a fresh id and the current time.
    pub fn new(user_id: &str, topic: &str, scorecard: Scorecard) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            topic: topic.to_string(),
            scorecard,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            text: "2 + 2?".into(),
            options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
            correct_answer_index: 1,
            explanation: String::new(),
        }
    }

    #[test]
    fn question_accepts_numeric_and_string_ids() {
        let json = r#"[
            {"id": 7, "question": "a?", "options": ["1","2","3","4"], "correctAnswer": 2},
            {"id": "q-8", "question": "b?", "options": ["1","2","3","4"], "correctAnswerIndex": 3}
        ]"#;
        let questions: Vec<Question> = serde_json::from_str(json).unwrap();
        assert_eq!(questions[0].id, "7");
        assert_eq!(questions[0].correct_answer_index, 2);
        assert_eq!(questions[1].id, "q-8");
        assert_eq!(questions[1].correct_answer_index, 3);
        assert_eq!(questions[1].explanation, "");
    }

    #[test]
    fn question_serializes_with_bank_field_names() {
        let value = serde_json::to_value(question("1")).unwrap();
        assert_eq!(value["question"], "2 + 2?");
        assert_eq!(value["correctAnswer"], 1);
        assert_eq!(question("1").correct_option(), Some("4"));
    }

    #[test]
    fn submission_parses_array_and_object() {
        let positional: AnswerSubmission = serde_json::from_str("[1, null, 3]").unwrap();
        assert_eq!(positional.answer_for(0, &question("a")), Some(1));
        assert_eq!(positional.answer_for(1, &question("b")), None);
        assert_eq!(positional.answer_for(5, &question("c")), None);

        let keyed: AnswerSubmission = serde_json::from_str(r#"{"a": 2, "b": null}"#).unwrap();
        assert_eq!(keyed.answer_for(0, &question("a")), Some(2));
        assert_eq!(keyed.answer_for(1, &question("b")), None);
        assert_eq!(keyed.answer_for(2, &question("missing")), None);
    }

    #[test]
    fn keyed_submission_falls_back_to_position_without_id() {
        let keyed: AnswerSubmission = serde_json::from_str(r#"{"0": 1}"#).unwrap();
        assert_eq!(keyed.answer_for(0, &question("")), Some(1));
    }

    #[test]
    fn performance_level_display_matches_serde() {
        for level in [
            PerformanceLevel::Excellent,
            PerformanceLevel::VeryGood,
            PerformanceLevel::Good,
            PerformanceLevel::Average,
            PerformanceLevel::NeedsImprovement,
        ] {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{level}\""));
        }
    }
}
