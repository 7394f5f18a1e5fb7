// SPDX-License-Identifier: MIT OR Apache-2.0
//! Streaming SSE chunk types for the Chat Completions API.
//!
//! These model the `chat.completion.chunk` objects written as `data:` frames
//! during server-sent-event streaming.

use serde::{Deserialize, Serialize};

use crate::chat::Usage;

/// A single streaming chunk (`chat.completion.chunk`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Unique chunk identifier, shared by all chunks of one response.
    pub id: String,
    /// Object type — always `"chat.completion.chunk"`.
    pub object: String,
    /// Unix timestamp when the response started, in seconds.
    pub created: u64,
    /// Model that generated the chunk.
    pub model: String,
    /// Streaming choices (always one element here).
    pub choices: Vec<ChunkChoice>,
    /// Token usage (only on the final chunk when available).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionChunk {
    /// Create a chunk with a single choice and no usage.
    #[must_use]
    pub fn new(id: &str, created: u64, model: &str, delta: ChunkDelta, finish: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".into(),
            created,
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason: finish.map(str::to_string),
            }],
            usage: None,
        }
    }
}

/// A single choice inside a streaming chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Zero-based index of this choice.
    pub index: u32,
    /// The incremental delta for this choice.
    pub delta: ChunkDelta,
    /// Finish reason (`null` while streaming, then `"stop"` or `"tool_calls"`).
    pub finish_reason: Option<String>,
}

/// The delta payload inside a streaming choice.
///
/// Each field is `Option` — only the fields that changed are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role of the message (first chunk only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Incremental text content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool call fragments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChunkToolCall>>,
}

impl ChunkDelta {
    /// A text delta, optionally opening the message with a role.
    #[must_use]
    pub fn content(text: impl Into<String>, with_role: bool) -> Self {
        Self {
            role: with_role.then(|| "assistant".into()),
            content: Some(text.into()),
            tool_calls: None,
        }
    }
}

/// A tool call fragment inside a streaming delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkToolCall {
    /// Index of the tool call in the overall `tool_calls` array.
    pub index: u32,
    /// Tool call ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Call type (`"function"`).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    /// Function call data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<ChunkFunctionCall>,
}

/// Function call data inside a streaming tool call fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFunctionCall {
    /// Function name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// JSON-encoded arguments string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}
