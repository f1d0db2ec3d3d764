//! Recovering JSON from noisy model output.
//!
//! Models wrap JSON in prose, markdown fences, or cut it off mid-stream.
//! The array span is located before fences are stripped, since fence lines
//! can sit next to legitimate brackets.

use serde_json::Value;

use crate::error::PipelineError;

/// Slice the outermost `[ ... ]` span out of `raw` and strip any markdown
/// fence markers that ended up inside it.
pub fn extract_json_array(raw: &str) -> Result<String, PipelineError> {
    let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) else {
        return Err(PipelineError::NoArrayFound);
    };
    if end <= start {
        return Err(PipelineError::NoArrayFound);
    }

    let slice = &raw[start..=end];
    Ok(slice.replace("```json", "").replace("```", "").trim().to_string())
}

/// Parse extracted text into a JSON array of candidate items.
pub fn parse_json_array(text: &str) -> Result<Vec<Value>, PipelineError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(PipelineError::MalformedJson(format!(
            "expected an array, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(PipelineError::MalformedJson(e.to_string())),
    }
}

/// Remove a leading ```json or ``` fence (and every other fence marker)
/// from a response that is expected to be a bare JSON document.
pub fn strip_code_fence(raw: &str) -> String {
    let cleaned = raw.trim();
    if cleaned.starts_with("```json") {
        cleaned
            .replace("```json", "")
            .replace("```", "")
            .trim()
            .to_string()
    } else if cleaned.starts_with("```") {
        cleaned.replace("```", "").trim().to_string()
    } else {
        cleaned.to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_array_from_surrounding_noise() {
        assert_eq!(
            extract_json_array("noise [1,2,3] trailing").unwrap(),
            "[1,2,3]"
        );
    }

    #[test]
    fn missing_brackets_is_no_array() {
        assert_eq!(
            extract_json_array("no brackets here"),
            Err(PipelineError::NoArrayFound)
        );
        assert_eq!(
            extract_json_array("only an opener ["),
            Err(PipelineError::NoArrayFound)
        );
    }

    #[test]
    fn reversed_brackets_is_no_array() {
        assert_eq!(
            extract_json_array("] wrong way round ["),
            Err(PipelineError::NoArrayFound)
        );
    }

    #[test]
    fn strips_fences_inside_the_span() {
        let raw = "Sure!\n```json\n[\n{\"a\": 1}\n```\n]\nHope this helps";
        let extracted = extract_json_array(raw).unwrap();
        assert!(!extracted.contains("```"));
        assert_eq!(parse_json_array(&extracted).unwrap().len(), 1);
    }

    #[test]
    fn fenced_response_keeps_nested_arrays() {
        let raw = "```json\n[{\"options\": [\"a\", \"b\"]}]\n```";
        let extracted = extract_json_array(raw).unwrap();
        assert_eq!(extracted, "[{\"options\": [\"a\", \"b\"]}]");
    }

    #[test]
    fn truncated_array_is_malformed_not_missing() {
        // The last `]` closes an inner options list, so a span exists but
        // does not parse.
        let raw = "[{\"question\": \"q\", \"options\": [\"a\", \"b\"]}, {\"question\": \"r\"";
        let extracted = extract_json_array(raw).unwrap();
        assert!(matches!(
            parse_json_array(&extracted),
            Err(PipelineError::MalformedJson(_))
        ));
    }

    #[test]
    fn non_array_json_is_malformed() {
        let err = parse_json_array("{\"a\": 1}").unwrap_err();
        assert_eq!(
            err,
            PipelineError::MalformedJson("expected an array, got an object".into())
        );
    }

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }
}
