// SPDX-License-Identifier: MIT OR Apache-2.0
//! Simulated function calling: manifest injection and `<tool_call>` parsing.
//!
//! The CLI exposes no tool blocks in `--print` mode, so the whole tool
//! protocol rides in the prompt. The `<tool_call>` wire grammar here is a
//! compatibility surface: deployed conversations depend on it.

use std::sync::OnceLock;

use ccr_openai::{Tool, ToolCall};
use regex::Regex;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// Fixed calling-convention block appended after the tool manifest.
const TOOL_CALL_INSTRUCTIONS: &str = "<tool_call_instructions>\n\
To call a tool, emit a block of exactly this form in your response:\n\
<tool_call>{\"name\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}</tool_call>\n\
Rules:\n\
- You may emit multiple <tool_call> blocks in one response.\n\
- The JSON body must be an object with \"name\" (a string) and \"arguments\" (an object).\n\
- Only call tools listed in <tools_available>.\n\
- Brief reasoning text may precede your tool calls, but nothing may follow them.\n\
</tool_call_instructions>\n";

fn tool_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<tool_call>(.*?)</tool_call>").unwrap())
}

// ---------------------------------------------------------------------------
// Manifest injection
// ---------------------------------------------------------------------------

/// Render the tool manifest preamble for a request's `tools` array.
///
/// Each tool becomes a `<tool>` element with name, description, and its
/// pretty-printed parameter schema (`{}` when absent); the fixed calling
/// convention follows the manifest.
#[must_use]
pub fn tool_manifest(tools: &[Tool]) -> String {
    let mut out = String::from("<tools_available>\n");
    for tool in tools {
        let f = &tool.function;
        out.push_str("<tool>\n");
        out.push_str("<name>");
        out.push_str(&f.name);
        out.push_str("</name>\n");
        out.push_str("<description>");
        out.push_str(f.description.as_deref().unwrap_or(""));
        out.push_str("</description>\n");
        let schema = f.parameters.clone().unwrap_or_else(|| Value::Object(Default::default()));
        out.push_str("<parameters>");
        out.push_str(&serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".into()));
        out.push_str("</parameters>\n");
        out.push_str("</tool>\n");
    }
    out.push_str("</tools_available>\n\n");
    out.push_str(TOOL_CALL_INSTRUCTIONS);
    out
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// A model response split into residual text and extracted tool calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// The input text with all `<tool_call>` blocks removed and trimmed;
    /// `None` when nothing remains.
    pub text: Option<String>,
    /// The extracted calls, in order of appearance.
    pub tool_calls: Vec<ToolCall>,
}

impl ParsedResponse {
    /// Returns `true` if at least one tool call was extracted.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Scan a final result text for `<tool_call>` blocks.
///
/// Malformed blocks (bodies that are not JSON objects with a string `name`)
/// are skipped with a warning; the remaining blocks are still honored. Ids
/// are taken from the body when the model echoed one, otherwise minted.
/// Arguments always come back as a JSON **string**, whatever shape the model
/// produced.
#[must_use]
pub fn parse_tool_calls(text: &str) -> ParsedResponse {
    let mut calls = Vec::new();

    for cap in tool_call_re().captures_iter(text) {
        let body = cap[1].trim();
        let parsed: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(err) => {
                warn!(target: "ccr.toolcall", %err, "skipping unparseable <tool_call> block");
                continue;
            }
        };
        let Some(name) = parsed.get("name").and_then(Value::as_str) else {
            warn!(target: "ccr.toolcall", "skipping <tool_call> block without a name");
            continue;
        };

        let id = parsed
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(mint_call_id);

        let arguments = match parsed.get("arguments") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => serde_json::to_string(other).unwrap_or_else(|_| "{}".into()),
            None => "{}".into(),
        };

        calls.push(ToolCall::function(id, name, arguments));
    }

    let residual = tool_call_re().replace_all(text, "");
    let residual = residual.trim();
    ParsedResponse {
        text: (!residual.is_empty()).then(|| residual.to_string()),
        tool_calls: calls,
    }
}

/// Mint a fresh `call_<24 hex>` identifier.
fn mint_call_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("call_{}", &hex[..24])
}
