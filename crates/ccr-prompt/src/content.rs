// SPDX-License-Identifier: MIT OR Apache-2.0
//! Extraction of message content into plain text.

use serde_json::Value;

/// Extract the text of a message `content` field.
///
/// The accepted shapes, in order:
/// - a plain string — returned as-is;
/// - an array of typed parts — only `text` parts are retained, joined with
///   newlines;
/// - an object with a string `text` field — that field;
/// - anything else — JSON-stringified as a fallback;
/// - absent — the empty string.
#[must_use]
pub fn content_to_text(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Some(obj) if obj.get("text").and_then(Value::as_str).is_some() => obj
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    }
}
