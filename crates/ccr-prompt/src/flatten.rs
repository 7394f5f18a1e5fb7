// SPDX-License-Identifier: MIT OR Apache-2.0
//! Message flattening and request translation.
//!
//! The CLI accepts one flat prompt, so the whole conversation is rendered
//! into a textual transcript. Tool-call turns are lowered back into the same
//! XML grammar the parser extracts, preserving context across turns.

use ccr_openai::{ChatCompletionRequest, ChatMessage, Role, ToolCall};
use serde_json::{json, Value};

use crate::content::content_to_text;
use crate::model::{resolve_model, ModelAlias};
use crate::toolcall::tool_manifest;

/// The translated form of one inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct CliInvocation {
    /// The flattened prompt, manifest included when tools are active.
    pub prompt: String,
    /// Resolved model alias.
    pub model: ModelAlias,
    /// Session-correlation key, forwarded verbatim from the request's `user`
    /// field. The dispatcher exchanges it for a CLI session id.
    pub session_key: Option<String>,
    /// Whether tool calling is active for this request.
    pub tools_active: bool,
}

/// Tools are active iff the request carries a non-empty `tools` array and
/// `tool_choice` is not `"none"`.
#[must_use]
pub fn tools_active(req: &ChatCompletionRequest) -> bool {
    let has_tools = req.tools.as_ref().is_some_and(|t| !t.is_empty());
    let choice_allows = !req.tool_choice.as_ref().is_some_and(|c| c.is_none_mode());
    has_tools && choice_allows
}

/// Translate an inbound request into a [`CliInvocation`].
#[must_use]
pub fn translate(req: &ChatCompletionRequest) -> CliInvocation {
    let tools_active = tools_active(req);

    let mut prompt = String::new();
    if tools_active
        && let Some(tools) = &req.tools
    {
        prompt.push_str(&tool_manifest(tools));
        prompt.push('\n');
    }
    prompt.push_str(&flatten_messages(&req.messages));

    CliInvocation {
        prompt,
        model: resolve_model(req.model.as_deref()),
        session_key: req.user.clone(),
        tools_active,
    }
}

/// Render the message history into the flat transcript form.
///
/// - `system` → `<system>…</system>`
/// - `user` → literal text
/// - `assistant` → `<previous_response>…</previous_response>`, with one
///   `<tool_call>` block per prior call
/// - a run of `tool` messages → one `<tool_results>` block
#[must_use]
pub fn flatten_messages(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    let mut i = 0;

    while i < messages.len() {
        let msg = &messages[i];
        let text = content_to_text(msg.content.as_ref());

        match msg.role {
            Role::System => {
                out.push_str("<system>");
                out.push_str(&text);
                out.push_str("</system>\n");
            }
            Role::User => {
                out.push_str(&text);
                out.push('\n');
            }
            Role::Assistant => match &msg.tool_calls {
                Some(calls) if !calls.is_empty() => {
                    out.push_str("<previous_response>");
                    if !text.is_empty() {
                        out.push_str(&text);
                        out.push('\n');
                    }
                    for call in calls {
                        out.push_str("<tool_call>");
                        out.push_str(&render_call(call));
                        out.push_str("</tool_call>\n");
                    }
                    out.push_str("</previous_response>\n");
                }
                _ => {
                    out.push_str("<previous_response>");
                    out.push_str(&text);
                    out.push_str("</previous_response>\n");
                }
            },
            Role::Tool => {
                out.push_str("<tool_results>\n");
                while i < messages.len() && messages[i].role == Role::Tool {
                    let entry = &messages[i];
                    out.push_str("<tool_result>\n<tool_call_id>");
                    out.push_str(entry.tool_call_id.as_deref().unwrap_or(""));
                    out.push_str("</tool_call_id>\n<output>");
                    out.push_str(&content_to_text(entry.content.as_ref()));
                    out.push_str("</output>\n</tool_result>\n");
                    i += 1;
                }
                out.push_str("</tool_results>\n");
                continue;
            }
        }
        i += 1;
    }

    out
}

/// Render one prior tool call as the JSON body of a `<tool_call>` block.
///
/// The stringified `arguments` are re-parsed into an object for readability;
/// a string that is not valid JSON is carried as-is.
fn render_call(call: &ToolCall) -> String {
    let arguments: Value = serde_json::from_str(&call.function.arguments)
        .unwrap_or_else(|_| Value::String(call.function.arguments.clone()));
    let body = json!({
        "id": call.id,
        "name": call.function.name,
        "arguments": arguments,
    });
    serde_json::to_string(&body).unwrap_or_default()
}
