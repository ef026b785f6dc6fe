//! Helpers for structured (JSON) model output.
//!
//! Models asked for "a single JSON object" frequently wrap it in a Markdown
//! code fence anyway. Every consumer of structured output goes through
//! [`strip_code_fences`] before parsing.

use serde_json::{Map, Value};

/// Remove one leading ```` ```json ```` or ```` ``` ```` marker and one
/// trailing ```` ``` ```` marker, then trim surrounding whitespace.
///
/// Input without fences is returned trimmed and otherwise untouched.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse model output as a JSON object, tolerating code fences.
///
/// Returns `None` when the payload is not valid JSON or not an object.
pub fn parse_json_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_code_fences(raw)) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
