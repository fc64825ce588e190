//! Interpretation of model output that is expected to be JSON.
//!
//! Models frequently wrap JSON in a Markdown fence or a sentence of preamble.
//! Decoding tries the raw text first, then the fenced body, then the outermost
//! bracketed span. Anything still undecodable is kept verbatim as
//! [`ModelOutput::Unstructured`].

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput<T> {
    Structured(T),
    /// The original response text, untouched
    Unstructured(String),
}

impl<T> ModelOutput<T> {
    pub fn is_structured(&self) -> bool {
        matches!(self, ModelOutput::Structured(_))
    }

    pub fn structured(self) -> Option<T> {
        match self {
            ModelOutput::Structured(value) => Some(value),
            ModelOutput::Unstructured(_) => None,
        }
    }
}

/// Decode `raw` as `T`, recovering from fences and surrounding prose.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let trimmed = raw.trim();
    let mut last_error = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let candidates = [strip_code_fence(trimmed), outermost_span(trimmed)];
    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e,
        }
    }

    Err(Error::MalformedModelOutput(last_error.to_string()))
}

/// Never fails: undecodable output becomes `Unstructured(raw)`.
pub fn interpret<T: DeserializeOwned>(raw: &str) -> ModelOutput<T> {
    match decode_json(raw) {
        Ok(value) => ModelOutput::Structured(value),
        Err(e) => {
            tracing::debug!(error = %e, "model output kept as raw text");
            ModelOutput::Unstructured(raw.to_string())
        }
    }
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_ticks = &text[start + 3..];
    // Skip the info string, e.g. ```json
    let body_start = after_ticks.find('\n')? + 1;
    let body = &after_ticks[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn outermost_span(text: &str) -> Option<&str> {
    let open = text.find(|c: char| c == '{' || c == '[')?;
    let close_char = if text[open..].starts_with('{') { '}' } else { ']' };
    let close = text.rfind(close_char)?;
    (close > open).then(|| &text[open..=close])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FaqEntry;
    use serde_json::{Map, Value};

    #[test]
    fn test_plain_json_object() {
        let map: Map<String, Value> = decode_json(r#" {"form_number": "I-130"} "#).unwrap();
        assert_eq!(map["form_number"], "I-130");
    }

    #[test]
    fn test_fenced_json_is_repaired() {
        let raw = "Here you go:\n```json\n{\"fees\": [\"$535\"], \"deadlines\": []}\n```\nLet me know!";
        let output: ModelOutput<Map<String, Value>> = interpret(raw);
        let map = output.structured().unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_prose_wrapped_array() {
        let raw = r#"Sure! [{"question": "Who files?", "answer": "The petitioner."}] Hope this helps."#;
        let faq: Vec<FaqEntry> = decode_json(raw).unwrap();
        assert_eq!(faq[0].question, "Who files?");
    }

    #[test]
    fn test_malformed_keeps_original_text() {
        let raw = "The form number is I-130 {not json";
        let output: ModelOutput<Map<String, Value>> = interpret(raw);
        assert_eq!(output, ModelOutput::Unstructured(raw.to_string()));
    }

    #[test]
    fn test_wrong_shape_is_unstructured() {
        // Valid JSON, but an array where an object is expected
        let output: ModelOutput<Map<String, Value>> = interpret("[1, 2, 3]");
        assert!(!output.is_structured());
    }

    #[test]
    fn test_decode_error_kind() {
        let err = decode_json::<Vec<FaqEntry>>("nothing here").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedModelOutput);
    }
}
