// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Classified events
// ---------------------------------------------------------------------------

/// One classified event from the CLI's line-delimited JSON stream.
///
/// Classification is by the top-level `type` discriminator. Anything the
/// relay does not act on — hook announcements, user echoes, unknown stream
/// subtypes — lands in [`CliEvent::Other`] with its payload intact.
#[derive(Debug, Clone)]
pub enum CliEvent {
    /// System initialization announcement (`type: "system", subtype: "init"`).
    Init(InitEvent),
    /// An incremental text fragment from a `content_block_delta` stream event.
    Delta {
        /// The delta text.
        text: String,
    },
    /// A complete assistant message.
    Assistant(AssistantEvent),
    /// The terminal result event.
    Result(ResultEvent),
    /// Any other parsed frame, kept verbatim.
    Other(Value),
}

/// Classify one parsed JSON frame from the CLI stream.
///
/// Never fails: frames that do not match a known shape are returned as
/// [`CliEvent::Other`].
#[must_use]
pub fn classify(value: Value) -> CliEvent {
    match value.get("type").and_then(Value::as_str) {
        Some("system") if value.get("subtype").and_then(Value::as_str) == Some("init") => {
            match serde_json::from_value::<InitEvent>(value.clone()) {
                Ok(init) => CliEvent::Init(init),
                Err(_) => CliEvent::Other(value),
            }
        }
        Some("stream_event") => match delta_text(&value) {
            Some(text) => CliEvent::Delta { text },
            None => CliEvent::Other(value),
        },
        Some("assistant") => match serde_json::from_value::<AssistantEvent>(value.clone()) {
            Ok(ev) => CliEvent::Assistant(ev),
            Err(_) => CliEvent::Other(value),
        },
        Some("result") => match serde_json::from_value::<ResultEvent>(value.clone()) {
            Ok(ev) => CliEvent::Result(ev),
            Err(_) => CliEvent::Other(value),
        },
        _ => CliEvent::Other(value),
    }
}

/// Extract the text of a `content_block_delta` stream event, if that is what
/// this frame carries.
#[must_use]
pub fn delta_text(value: &Value) -> Option<String> {
    let event = value.get("event")?;
    if event.get("type")?.as_str()? != "content_block_delta" {
        return None;
    }
    let delta = event.get("delta")?;
    delta.get("text")?.as_str().map(str::to_string)
}

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// The `system`/`init` announcement emitted once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitEvent {
    /// CLI session identifier for this run.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Model the CLI resolved.
    #[serde(default)]
    pub model: Option<String>,
    /// Tools available to the CLI (unused by the relay).
    #[serde(default)]
    pub tools: Vec<String>,
}

/// A complete assistant message (`type: "assistant"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantEvent {
    /// The wrapped message.
    pub message: AssistantMessage,
    /// Session identifier, when present.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// The message payload inside an [`AssistantEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// Content blocks; only text blocks matter to the relay.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Model that produced the message.
    #[serde(default)]
    pub model: Option<String>,
    /// Stop reason, when the message is final.
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token usage for this message.
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl AssistantMessage {
    /// Concatenated text of all text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect()
    }
}

/// A content block inside an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A text block.
    Text {
        /// The text content.
        text: String,
    },
    /// Any other block kind (tool_use, thinking, …).
    #[serde(other)]
    Other,
}

/// The terminal result event (`type: "result"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEvent {
    /// Result subtype (`"success"`, `"error_during_execution"`, …).
    #[serde(default)]
    pub subtype: Option<String>,
    /// The final concatenated result text.
    #[serde(default)]
    pub result: Option<String>,
    /// Whether the run ended in error.
    #[serde(default)]
    pub is_error: bool,
    /// Wall-clock duration in milliseconds.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Number of conversation turns consumed.
    #[serde(default)]
    pub num_turns: Option<u32>,
    /// Total cost in USD.
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
    /// Aggregate token usage.
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    /// Per-model usage, keyed by model id.
    #[serde(default, rename = "modelUsage")]
    pub model_usage: serde_json::Map<String, Value>,
    /// Session identifier for this run.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ResultEvent {
    /// The first model id in the per-model usage map, if any.
    #[must_use]
    pub fn first_model(&self) -> Option<&str> {
        self.model_usage.keys().next().map(String::as_str)
    }

    /// Input/output token counts, zero when absent.
    #[must_use]
    pub fn token_counts(&self) -> (u64, u64) {
        match &self.usage {
            Some(u) => (u.input_tokens, u.output_tokens),
            None => (0, 0),
        }
    }
}

/// Token usage counters as reported by the CLI.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens consumed.
    #[serde(default)]
    pub input_tokens: u64,
    /// Output tokens generated.
    #[serde(default)]
    pub output_tokens: u64,
}
