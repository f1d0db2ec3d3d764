//! Filesystem-backed static question bank.
//!
//! Each topic lives in `<dir>/<topic>_questions.json` as a JSON array of
//! questions. Loading never fails: unreadable or malformed files yield an
//! empty bank and a warning.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::model::{Question, OPTION_COUNT};
use crate::shuffle::shuffle_options_with;
use crate::traits::QuestionBank;

/// Question bank reading one JSON file per topic from a directory.
#[derive(Debug, Clone)]
pub struct FileQuestionBank {
    dir: PathBuf,
}

impl FileQuestionBank {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the bank file for `topic`.
    pub fn topic_path(&self, topic: &str) -> PathBuf {
        self.dir
            .join(format!("{}_questions.json", topic.trim().to_lowercase()))
    }
}

impl QuestionBank for FileQuestionBank {
    fn load(&self, topic: &str) -> Vec<Question> {
        let path = self.topic_path(topic);
        match parse_bank_file(&path) {
            Ok(questions) => questions,
            Err(e) => {
                tracing::warn!("failed to load questions from {}: {e:#}", path.display());
                Vec::new()
            }
        }
    }
}

/// Parse a single bank file.
pub fn parse_bank_file(path: &Path) -> Result<Vec<Question>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bank file: {}", path.display()))?;
    parse_bank_str(&content, path)
}

/// Parse bank JSON (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<Vec<Question>> {
    serde_json::from_str(content)
        .with_context(|| format!("failed to parse bank JSON: {}", source_path.display()))
}

/// Load every `*_questions.json` file in a directory, keyed by topic.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<(String, Vec<Question>)>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut topics = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        let Some(topic) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix("_questions.json"))
        else {
            continue;
        };
        topics.push((topic.to_string(), parse_bank_file(&path)?));
    }
    topics.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(topics)
}

/// Pick up to `count` distinct questions and shuffle each one's options.
pub fn sample_questions<R: Rng + ?Sized>(
    questions: &[Question],
    count: usize,
    rng: &mut R,
) -> Vec<Question> {
    questions
        .choose_multiple(rng, count.min(questions.len()))
        .map(|q| shuffle_options_with(q, rng))
        .collect()
}

/// A problem found while checking a bank file.
#[derive(Debug, Clone)]
pub struct BankWarning {
    /// The question id, when the warning concerns a single question.
    pub question_id: Option<String>,
    pub message: String,
}

/// Check bank questions for problems that would break shuffling or grading.
pub fn validate_bank(questions: &[Question]) -> Vec<BankWarning> {
    let mut warnings = Vec::new();
    let mut seen_ids = HashSet::new();

    for question in questions {
        let id = Some(question.id.clone());

        if !question.id.is_empty() && !seen_ids.insert(question.id.as_str()) {
            warnings.push(BankWarning {
                question_id: id.clone(),
                message: format!("duplicate question ID: {}", question.id),
            });
        }

        if question.text.trim().is_empty() {
            warnings.push(BankWarning {
                question_id: id.clone(),
                message: "question text is empty".into(),
            });
        }

        if question.options.len() != OPTION_COUNT {
            warnings.push(BankWarning {
                question_id: id.clone(),
                message: format!(
                    "expected {OPTION_COUNT} options, found {}",
                    question.options.len()
                ),
            });
        }

        if question.correct_answer_index >= question.options.len() {
            warnings.push(BankWarning {
                question_id: id.clone(),
                message: format!(
                    "correct answer index {} is out of range",
                    question.correct_answer_index
                ),
            });
        }

        let distinct: HashSet<&str> = question.options.iter().map(String::as_str).collect();
        if distinct.len() != question.options.len() {
            warnings.push(BankWarning {
                question_id: id,
                message: "duplicate option text".into(),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const BANK: &str = r#"[
        {"id": 1, "question": "2 + 2?", "options": ["3", "4", "5", "6"], "correctAnswer": 1, "explanation": "Basic addition."},
        {"id": 2, "question": "10 / 4?", "options": ["2", "2.5", "3", "4"], "correctAnswer": 1},
        {"id": 3, "question": "3 * 3?", "options": ["6", "9", "12", "33"], "correctAnswer": 1}
    ]"#;

    #[test]
    fn loads_topic_file_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quantitative_questions.json"), BANK).unwrap();

        let bank = FileQuestionBank::new(dir.path());
        let questions = bank.load("Quantitative");
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].id, "1");
        assert_eq!(questions[1].explanation, "");
    }

    #[test]
    fn missing_or_malformed_bank_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken_questions.json"), "{ not json").unwrap();

        let bank = FileQuestionBank::new(dir.path());
        assert!(bank.load("absent").is_empty());
        assert!(bank.load("broken").is_empty());
    }

    #[test]
    fn sample_is_bounded_and_distinct() {
        let questions = parse_bank_str(BANK, Path::new("bank.json")).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let picked = sample_questions(&questions, 20, &mut rng);
        assert_eq!(picked.len(), 3);
        let ids: HashSet<_> = picked.iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids.len(), 3);

        for q in &picked {
            let original = questions.iter().find(|o| o.id == q.id).unwrap();
            assert_eq!(q.correct_option(), original.correct_option());
        }

        assert_eq!(sample_questions(&questions, 2, &mut rng).len(), 2);
        assert!(sample_questions(&[], 5, &mut rng).is_empty());
    }

    #[test]
    fn validate_flags_structural_problems() {
        let questions = vec![
            Question {
                id: "a".into(),
                text: "ok".into(),
                options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
                correct_answer_index: 0,
                explanation: String::new(),
            },
            Question {
                id: "a".into(),
                text: " ".into(),
                options: vec!["x".into(), "x".into(), "y".into()],
                correct_answer_index: 3,
                explanation: String::new(),
            },
        ];
        let warnings = validate_bank(&questions);
        let messages: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("duplicate question ID")));
        assert!(messages.iter().any(|m| m.contains("text is empty")));
        assert!(messages.iter().any(|m| m.contains("expected 4 options")));
        assert!(messages.iter().any(|m| m.contains("out of range")));
        assert!(messages.iter().any(|m| m.contains("duplicate option")));
        assert!(warnings.iter().all(|w| w.question_id.as_deref() == Some("a")));
    }

    #[test]
    fn load_directory_collects_topics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logical_questions.json"), BANK).unwrap();
        std::fs::write(dir.path().join("verbal_questions.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let topics = load_bank_directory(dir.path()).unwrap();
        let names: Vec<_> = topics.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["logical", "verbal"]);
        assert_eq!(topics[0].1.len(), 3);
    }
}
