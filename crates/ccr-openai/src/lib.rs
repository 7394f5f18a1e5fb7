// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Request, response, and message types for the Chat Completions API.
pub mod chat;
/// Streaming `chat.completion.chunk` types.
pub mod chunk;
/// The OpenAI-style error envelope.
pub mod envelope;
/// Id generation, timestamps, and model-name normalization.
pub mod ident;

pub use chat::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, ChoiceMessage,
    FunctionCall, FunctionDef, ModelInfo, ModelList, Role, Tool, ToolCall, ToolChoice,
    ToolChoiceMode, Usage,
};
pub use chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta, ChunkFunctionCall, ChunkToolCall};
pub use envelope::{ErrorBody, ErrorEnvelope};
pub use ident::{completion_id, normalize_model_name, request_id, unix_now, MODEL_IDS};
