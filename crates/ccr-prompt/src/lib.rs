// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Content-part extraction.
pub mod content;
/// Message flattening and request translation.
pub mod flatten;
/// Model alias resolution.
pub mod model;
/// Tool manifest injection and `<tool_call>` extraction.
pub mod toolcall;

pub use content::content_to_text;
pub use flatten::{flatten_messages, tools_active, translate, CliInvocation};
pub use model::{resolve_model, ModelAlias};
pub use toolcall::{parse_tool_calls, tool_manifest, ParsedResponse};
