// SPDX-License-Identifier: MIT OR Apache-2.0
//! Round-trip tests: lowering prior tool-call turns into the prompt grammar
//! and parsing them back must preserve every call.

use ccr_openai::{ChatMessage, Role, ToolCall};
use ccr_prompt::{flatten_messages, parse_tool_calls};
use serde_json::{json, Value};

fn strip_wrapper(flattened: &str) -> &str {
    flattened
        .trim_start_matches("<previous_response>")
        .trim_end()
        .trim_end_matches("</previous_response>")
}

#[test]
fn single_call_roundtrip() {
    let call = ToolCall::function("call_abc", "get_weather", "{\"city\":\"Paris\"}");
    let msg = ChatMessage::assistant_tool_calls(Some("Let me check.".into()), vec![call.clone()]);

    let flattened = flatten_messages(&[msg]);
    let parsed = parse_tool_calls(strip_wrapper(&flattened));

    assert_eq!(parsed.text.as_deref(), Some("Let me check."));
    assert_eq!(parsed.tool_calls.len(), 1);
    let back = &parsed.tool_calls[0];
    assert_eq!(back.id, call.id);
    assert_eq!(back.function.name, call.function.name);

    let original: Value = serde_json::from_str(&call.function.arguments).unwrap();
    let roundtripped: Value = serde_json::from_str(&back.function.arguments).unwrap();
    assert_eq!(roundtripped, original);
}

#[test]
fn multiple_calls_roundtrip_in_order() {
    let calls = vec![
        ToolCall::function("call_1", "alpha", "{\"n\":1}"),
        ToolCall::function("call_2", "beta", "{\"items\":[\"a\",\"b\"],\"flag\":true}"),
        ToolCall::function("call_3", "gamma", "{}"),
    ];
    let msg = ChatMessage::assistant_tool_calls(None, calls.clone());

    let flattened = flatten_messages(&[msg]);
    let parsed = parse_tool_calls(strip_wrapper(&flattened));

    assert_eq!(parsed.tool_calls.len(), calls.len());
    for (back, original) in parsed.tool_calls.iter().zip(&calls) {
        assert_eq!(back.id, original.id);
        assert_eq!(back.function.name, original.function.name);
        let a: Value = serde_json::from_str(&back.function.arguments).unwrap();
        let b: Value = serde_json::from_str(&original.function.arguments).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn nested_argument_objects_survive() {
    let args = json!({
        "filters": {"min": 0, "max": 10, "tags": ["x", "y"]},
        "query": "line one\nline two",
        "strict": false
    });
    let call = ToolCall::function("call_n", "search", serde_json::to_string(&args).unwrap());
    let msg = ChatMessage::assistant_tool_calls(None, vec![call]);

    let flattened = flatten_messages(&[msg]);
    let parsed = parse_tool_calls(strip_wrapper(&flattened));

    let back: Value = serde_json::from_str(&parsed.tool_calls[0].function.arguments).unwrap();
    assert_eq!(back, args);
}

#[test]
fn full_turn_history_keeps_results_and_calls_distinct() {
    let messages = vec![
        ChatMessage::text(Role::User, "weather in Paris?"),
        ChatMessage::assistant_tool_calls(
            Some("Checking.".into()),
            vec![ToolCall::function("call_w", "get_weather", "{\"city\":\"Paris\"}")],
        ),
        ChatMessage::tool_result("call_w", "sunny, 22C"),
        ChatMessage::text(Role::User, "and tomorrow?"),
    ];

    let flattened = flatten_messages(&messages);
    assert!(flattened.contains("<tool_call_id>call_w</tool_call_id>"));
    assert!(flattened.contains("<output>sunny, 22C</output>"));

    // The tool_result block must not register as a tool call.
    let parsed = parse_tool_calls(&flattened);
    assert_eq!(parsed.tool_calls.len(), 1);
    assert_eq!(parsed.tool_calls[0].id, "call_w");
}
