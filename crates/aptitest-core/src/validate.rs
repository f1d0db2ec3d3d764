//! Schema validation for generated question items.
//!
//! Individual fields are defaulted leniently (`correctAnswer`, `explanation`),
//! but the batch as a whole must reach a minimum yield. A short batch fails;
//! it is never topped up with placeholder questions.

use serde_json::{Map, Value};

use crate::error::PipelineError;
use crate::model::{Question, OPTION_COUNT};

/// Number of valid items a generation batch must yield by default.
pub const DEFAULT_REQUIRED_COUNT: usize = 3;

/// Explanation used when an item does not carry one.
pub const DEFAULT_EXPLANATION: &str = "Answer explanation";

/// Validate candidate items and return exactly `required_count` questions.
///
/// Valid items get 1-based ids in the order they pass validation; dropped
/// items do not consume an id.
pub fn validate_items(
    items: &[Value],
    required_count: usize,
) -> Result<Vec<Question>, PipelineError> {
    let mut valid = Vec::new();

    for (index, item) in items.iter().enumerate() {
        match coerce_item(item) {
            Ok(mut question) => {
                question.id = (valid.len() + 1).to_string();
                tracing::debug!(item = index + 1, "accepted generated question");
                valid.push(question);
            }
            Err(reason) => {
                tracing::warn!(item = index + 1, "dropping generated question: {reason}");
            }
        }
    }

    if valid.len() < required_count {
        tracing::warn!(
            "only {}/{} valid questions, failing without fallback",
            valid.len(),
            required_count
        );
        return Err(PipelineError::InsufficientValidItems {
            found: valid.len(),
            required: required_count,
        });
    }

    valid.truncate(required_count);
    Ok(valid)
}

fn coerce_item(item: &Value) -> Result<Question, String> {
    let Value::Object(fields) = item else {
        return Err("not an object".into());
    };

    let text = match fields.get("question") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(_) => return Err("question text is empty or not a string".into()),
        None => return Err("missing question text".into()),
    };

    let options = match fields.get("options") {
        Some(Value::Array(options)) if options.len() == OPTION_COUNT => options
            .iter()
            .map(option_text)
            .collect::<Option<Vec<_>>>()
            .ok_or("options must be strings or scalars")?,
        Some(Value::Array(options)) => {
            return Err(format!(
                "expected {OPTION_COUNT} options, got {}",
                options.len()
            ))
        }
        Some(_) => return Err("options is not a list".into()),
        None => return Err("missing options".into()),
    };

    let correct_answer_index = correct_index(fields)?;

    let explanation = match fields.get("explanation") {
        Some(Value::String(s)) => s.clone(),
        _ => DEFAULT_EXPLANATION.to_string(),
    };

    Ok(Question {
        id: String::new(),
        text,
        options,
        correct_answer_index,
        explanation,
    })
}

fn option_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn correct_index(fields: &Map<String, Value>) -> Result<usize, String> {
    let raw = fields
        .get("correctAnswer")
        .or_else(|| fields.get("correctAnswerIndex"));

    match raw {
        None => Ok(0),
        Some(value) => value
            .as_u64()
            .map(|n| n as usize)
            .filter(|&n| n < OPTION_COUNT)
            .ok_or_else(|| format!("correct answer index {value} out of range")),
    }
}
