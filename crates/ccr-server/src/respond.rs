// SPDX-License-Identifier: MIT OR Apache-2.0
//! Response-builder projections: pure functions from driver outputs to
//! OpenAI response and chunk shapes, plus SSE frame rendering.

use axum::body::Bytes;
use ccr_openai::{
    ChatCompletionChunk, ChatCompletionResponse, Choice, ChoiceMessage, ChunkDelta,
    ChunkFunctionCall, ChunkToolCall, Usage,
};
use ccr_prompt::ParsedResponse;
use ccr_stream::{AssistantEvent, ResultEvent};
use serde::Serialize;

/// Model id used when the upstream never reported one.
pub const FALLBACK_MODEL: &str = "claude-sonnet-4";

// ---------------------------------------------------------------------------
// SSE frame rendering
// ---------------------------------------------------------------------------

/// The comment frame sent right after the SSE headers to defeat proxy
/// buffering.
pub const SSE_OK: &[u8] = b":ok\n\n";

/// The stream terminator.
pub const SSE_DONE: &[u8] = b"data: [DONE]\n\n";

/// Render one payload as a `data: <json>\n\n` frame.
#[must_use]
pub fn sse_frame<T: Serialize>(payload: &T) -> Bytes {
    match serde_json::to_string(payload) {
        Ok(json) => Bytes::from(format!("data: {json}\n\n")),
        // Unreachable for the relay's own serializable types.
        Err(_) => Bytes::from_static(b"data: {}\n\n"),
    }
}

// ---------------------------------------------------------------------------
// Chunk constructors
// ---------------------------------------------------------------------------

/// A streaming text chunk. `with_role` opens the assistant message and is
/// set on the first non-empty chunk only.
#[must_use]
pub fn content_chunk(
    id: &str,
    created: u64,
    model: &str,
    text: &str,
    with_role: bool,
) -> ChatCompletionChunk {
    ChatCompletionChunk::new(id, created, model, ChunkDelta::content(text, with_role), None)
}

/// The terminating chunk: empty delta and a finish reason.
#[must_use]
pub fn done_chunk(id: &str, created: u64, model: &str, finish: &str) -> ChatCompletionChunk {
    ChatCompletionChunk::new(id, created, model, ChunkDelta::default(), Some(finish))
}

/// Project a complete assistant event to a chunk.
///
/// The chunk carries the concatenated text of the event's text parts, opens
/// the message iff this is the first chunk, and finishes with `"stop"` iff
/// the event carries a stop reason.
#[must_use]
pub fn assistant_chunk(
    id: &str,
    created: u64,
    event: &AssistantEvent,
    first: bool,
) -> ChatCompletionChunk {
    let model = event.message.model.as_deref().unwrap_or(FALLBACK_MODEL);
    let finish = event.message.stop_reason.is_some().then_some("stop");
    ChatCompletionChunk::new(
        id,
        created,
        model,
        ChunkDelta::content(event.message.text(), first),
        finish,
    )
}

/// The replayed chunk sequence for a tools-mode response that contained tool
/// calls: an optional leading text chunk, one chunk per call, and the
/// `tool_calls` terminator.
#[must_use]
pub fn tool_call_chunks(
    id: &str,
    created: u64,
    model: &str,
    parsed: &ParsedResponse,
) -> Vec<ChatCompletionChunk> {
    let mut chunks = Vec::new();
    let mut role_sent = false;

    if let Some(text) = &parsed.text {
        chunks.push(content_chunk(id, created, model, text, true));
        role_sent = true;
    }

    for (index, call) in parsed.tool_calls.iter().enumerate() {
        let delta = ChunkDelta {
            role: (!role_sent).then(|| "assistant".into()),
            content: None,
            tool_calls: Some(vec![ChunkToolCall {
                index: index as u32,
                id: Some(call.id.clone()),
                call_type: Some("function".into()),
                function: Some(ChunkFunctionCall {
                    name: Some(call.function.name.clone()),
                    arguments: Some(call.function.arguments.clone()),
                }),
            }]),
        };
        role_sent = true;
        chunks.push(ChatCompletionChunk::new(id, created, model, delta, None));
    }

    chunks.push(done_chunk(id, created, model, "tool_calls"));
    chunks
}

/// The replayed chunk sequence for a tools-mode response with no calls: the
/// full text as one chunk, then the `stop` terminator.
#[must_use]
pub fn text_replay_chunks(
    id: &str,
    created: u64,
    model: &str,
    text: &str,
) -> Vec<ChatCompletionChunk> {
    vec![
        content_chunk(id, created, model, text, true),
        done_chunk(id, created, model, "stop"),
    ]
}

// ---------------------------------------------------------------------------
// Full-response constructors
// ---------------------------------------------------------------------------

/// Project the terminal result to a full non-streaming response.
#[must_use]
pub fn completion_from_result(id: &str, created: u64, result: &ResultEvent) -> ChatCompletionResponse {
    let model = result.first_model().unwrap_or(FALLBACK_MODEL).to_string();
    let (input, output) = result.token_counts();
    ChatCompletionResponse {
        id: id.to_string(),
        object: "chat.completion".into(),
        created,
        model,
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".into(),
                content: Some(result.result.clone().unwrap_or_default()),
                tool_calls: None,
            },
            finish_reason: Some("stop".into()),
        }],
        usage: Some(Usage::from_counts(input, output)),
    }
}

/// Fallback non-streaming response when no terminal result was observed:
/// the buffered text with zero usage counts.
#[must_use]
pub fn completion_from_text(
    id: &str,
    created: u64,
    model: &str,
    text: &str,
) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: id.to_string(),
        object: "chat.completion".into(),
        created,
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".into(),
                content: Some(text.to_string()),
                tool_calls: None,
            },
            finish_reason: Some("stop".into()),
        }],
        usage: Some(Usage::default()),
    }
}

/// Non-streaming response carrying extracted tool calls.
///
/// Usage comes from the terminal result when one was observed; when the
/// calls were recovered from buffered text alone, counts stay zero.
#[must_use]
pub fn tool_call_completion(
    id: &str,
    created: u64,
    model: &str,
    parsed: &ParsedResponse,
    result: Option<&ResultEvent>,
) -> ChatCompletionResponse {
    let usage = match result {
        Some(r) => {
            let (input, output) = r.token_counts();
            Usage::from_counts(input, output)
        }
        None => Usage::default(),
    };
    ChatCompletionResponse {
        id: id.to_string(),
        object: "chat.completion".into(),
        created,
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".into(),
                content: parsed.text.clone(),
                tool_calls: Some(parsed.tool_calls.clone()),
            },
            finish_reason: Some("tool_calls".into()),
        }],
        usage: Some(usage),
    }
}

/// Pick the model name for a buffered-replay response: the result's
/// per-model usage key wins, then the last assistant-reported model, then
/// the fallback.
#[must_use]
pub fn replay_model<'a>(
    result: Option<&'a ResultEvent>,
    assistant_model: Option<&'a str>,
) -> &'a str {
    result
        .and_then(ResultEvent::first_model)
        .or(assistant_model)
        .unwrap_or(FALLBACK_MODEL)
}
