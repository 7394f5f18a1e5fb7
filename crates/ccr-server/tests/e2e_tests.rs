// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end dispatcher scenarios against a mock CLI that plays back
//! canned stream-json output. Unix-only (the mock is a shell script).
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ccr_server::{build_app, AppState};
use ccr_sessions::SessionStore;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_mock(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("mock-claude");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write mock script");
    let mut perms = std::fs::metadata(&path).expect("mock metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod mock script");
    path
}

fn state_with(dir: &tempfile::TempDir, mock: &Path) -> AppState {
    AppState {
        claude_bin: mock.to_string_lossy().into_owned(),
        timeout: Duration::from_secs(10),
        sessions: Arc::new(SessionStore::with_path(dir.path().join("sessions.json"))),
    }
}

async fn post_completions(app: axum::Router, body: Value) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/v1/chat/completions")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}

/// Split an SSE body into its `data:` payloads.
fn data_frames(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

fn weather_tools() -> Value {
    json!([{
        "type": "function",
        "function": {
            "name": "get_weather",
            "description": "Look up current weather",
            "parameters": {"type": "object", "properties": {"city": {"type": "string"}}}
        }
    }])
}

// ---------------------------------------------------------------------------
// Scenario 1: non-streaming, no tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_streaming_no_tools() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = write_mock(
        tmp.path(),
        r#"echo '{"type":"result","subtype":"success","result":"hello","usage":{"input_tokens":3,"output_tokens":2},"modelUsage":{"claude-sonnet-4":{}}}'"#,
    );
    let app = build_app(state_with(&tmp, &mock));

    let resp = post_completions(
        app,
        json!({"model": "claude-sonnet-4", "messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["object"], "chat.completion");
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(body["model"], "claude-sonnet-4");
    assert_eq!(body["choices"][0]["message"]["content"], "hello");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(body["usage"]["total_tokens"], 5);
}

// ---------------------------------------------------------------------------
// Scenario 2: streaming, no tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streaming_no_tools_passes_deltas_through_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = write_mock(
        tmp.path(),
        r#"echo '{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"he"}}}'
echo '{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"llo"}}}'
echo '{"type":"result","subtype":"success","result":"hello"}'"#,
    );
    let app = build_app(state_with(&tmp, &mock));

    let resp = post_completions(
        app,
        json!({
            "model": "claude-sonnet-4",
            "stream": true,
            "messages": [{"role": "user", "content": "hi"}]
        }),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    let request_id = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(request_id.len(), 24);

    let body = body_string(resp).await;
    assert!(body.starts_with(":ok\n\n"), "leading comment frame expected");

    let frames = data_frames(&body);
    assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));

    let chunks: Vec<Value> = frames[..frames.len() - 1]
        .iter()
        .map(|f| serde_json::from_str(f).unwrap())
        .collect();
    assert_eq!(chunks.len(), 3);

    assert_eq!(chunks[0]["choices"][0]["delta"]["role"], "assistant");
    assert_eq!(chunks[0]["choices"][0]["delta"]["content"], "he");
    assert!(chunks[1]["choices"][0]["delta"].get("role").is_none());
    assert_eq!(chunks[1]["choices"][0]["delta"]["content"], "llo");
    assert_eq!(chunks[2]["choices"][0]["delta"], json!({}));
    assert_eq!(chunks[2]["choices"][0]["finish_reason"], "stop");

    // Stream-ordering law: concatenated deltas equal the upstream text.
    let text: String = chunks
        .iter()
        .filter_map(|c| c["choices"][0]["delta"]["content"].as_str())
        .collect();
    assert_eq!(text, "hello");
}

// ---------------------------------------------------------------------------
// Scenario 3: tools, non-streaming, one call
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tools_non_streaming_extracts_the_call() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = write_mock(
        tmp.path(),
        r#"echo '{"type":"result","subtype":"success","result":"Let me check.\n<tool_call>{\"name\":\"get_weather\",\"arguments\":{\"city\":\"Paris\"}}</tool_call>","usage":{"input_tokens":20,"output_tokens":9}}'"#,
    );
    let app = build_app(state_with(&tmp, &mock));

    let resp = post_completions(
        app,
        json!({
            "model": "claude-sonnet-4",
            "messages": [{"role": "user", "content": "weather in Paris?"}],
            "tools": weather_tools()
        }),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let message = &body["choices"][0]["message"];
    assert_eq!(message["role"], "assistant");
    assert_eq!(message["content"], "Let me check.");

    let call = &message["tool_calls"][0];
    assert_eq!(call["type"], "function");
    assert_eq!(call["function"]["name"], "get_weather");
    let args: Value = serde_json::from_str(call["function"]["arguments"].as_str().unwrap()).unwrap();
    assert_eq!(args, json!({"city": "Paris"}));

    let id = call["id"].as_str().unwrap();
    assert!(id.starts_with("call_"));
    assert_eq!(id.len(), "call_".len() + 24);
    assert!(id["call_".len()..]
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    assert_eq!(body["choices"][0]["finish_reason"], "tool_calls");
    assert_eq!(body["usage"]["prompt_tokens"], 20);
}

// ---------------------------------------------------------------------------
// Scenario 4: tools, streaming, no calls in the output
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tools_streaming_without_calls_replays_text() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = write_mock(
        tmp.path(),
        r#"echo '{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"sunny"}}}'
echo '{"type":"result","subtype":"success","result":"sunny today"}'"#,
    );
    let app = build_app(state_with(&tmp, &mock));

    let resp = post_completions(
        app,
        json!({
            "stream": true,
            "messages": [{"role": "user", "content": "weather?"}],
            "tools": weather_tools()
        }),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.starts_with(":ok\n\n"));

    let frames = data_frames(&body);
    assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));
    let chunks: Vec<Value> = frames[..frames.len() - 1]
        .iter()
        .map(|f| serde_json::from_str(f).unwrap())
        .collect();

    // The full authoritative text arrives as one chunk, then the stop chunk.
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0]["choices"][0]["delta"]["role"], "assistant");
    assert_eq!(chunks[0]["choices"][0]["delta"]["content"], "sunny today");
    assert!(chunks[0]["choices"][0]["finish_reason"].is_null());
    assert_eq!(chunks[1]["choices"][0]["finish_reason"], "stop");
}

// ---------------------------------------------------------------------------
// Tools, streaming, with calls: the replayed tool-call sequence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tools_streaming_with_calls_replays_tool_call_chunks() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = write_mock(
        tmp.path(),
        r#"echo '{"type":"result","subtype":"success","result":"<tool_call>{\"name\":\"get_weather\",\"arguments\":{\"city\":\"Paris\"}}</tool_call>"}'"#,
    );
    let app = build_app(state_with(&tmp, &mock));

    let resp = post_completions(
        app,
        json!({
            "stream": true,
            "messages": [{"role": "user", "content": "weather?"}],
            "tools": weather_tools()
        }),
    )
    .await;

    let body = body_string(resp).await;
    let frames = data_frames(&body);
    assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));
    let chunks: Vec<Value> = frames[..frames.len() - 1]
        .iter()
        .map(|f| serde_json::from_str(f).unwrap())
        .collect();

    // No residual text: role arrives on the first tool-call chunk.
    assert_eq!(chunks.len(), 2);
    let first = &chunks[0]["choices"][0]["delta"];
    assert_eq!(first["role"], "assistant");
    let call = &first["tool_calls"][0];
    assert_eq!(call["index"], 0);
    assert_eq!(call["type"], "function");
    assert_eq!(call["function"]["name"], "get_weather");
    assert_eq!(chunks[1]["choices"][0]["finish_reason"], "tool_calls");
}

// ---------------------------------------------------------------------------
// Scenario 6: malformed tool-call block
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_tool_call_block_falls_back_to_text() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = write_mock(
        tmp.path(),
        r#"echo '{"type":"result","subtype":"success","result":"<tool_call>{not json}</tool_call> real text"}'"#,
    );
    let app = build_app(state_with(&tmp, &mock));

    let resp = post_completions(
        app,
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "tools": weather_tools()
        }),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let message = &body["choices"][0]["message"];
    assert_eq!(message["content"], "real text");
    assert!(message.get("tool_calls").is_none());
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
}

// ---------------------------------------------------------------------------
// Error paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn abnormal_exit_without_result_is_a_500() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = write_mock(tmp.path(), "exit 7");
    let app = build_app(state_with(&tmp, &mock));

    let resp = post_completions(
        app,
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("code 7"));
}

#[tokio::test]
async fn streaming_timeout_reports_in_band() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = write_mock(tmp.path(), "sleep 30");
    let mut state = state_with(&tmp, &mock);
    state.timeout = Duration::from_millis(200);
    let app = build_app(state);

    let resp = post_completions(
        app,
        json!({"stream": true, "messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;

    // Headers were committed before the failure: 200 with an in-band error.
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    let frames = data_frames(&body);
    assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));
    let error: Value = serde_json::from_str(&frames[0]).unwrap();
    assert!(error["error"]["message"].as_str().unwrap().contains("timed out"));
}

// ---------------------------------------------------------------------------
// Scenario 5: client disconnect mid-stream
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_disconnect_mid_stream_kills_the_subprocess() {
    let tmp = tempfile::tempdir().unwrap();
    let marker = tmp.path().join("survived.txt");
    // The mock emits one delta, then would write a marker and finish — but a
    // disconnected client must get it killed during the sleep.
    let mock = write_mock(
        tmp.path(),
        &format!(
            r#"echo '{{"type":"stream_event","event":{{"type":"content_block_delta","delta":{{"type":"text_delta","text":"first"}}}}}}'
sleep 2
echo done > {}
echo '{{"type":"result","result":"late"}}'"#,
            marker.display()
        ),
    );
    let app = build_app(state_with(&tmp, &mock));

    let resp = post_completions(
        app,
        json!({"stream": true, "messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Read until the first delta frame has arrived, then hang up.
    let mut body = resp.into_body();
    let mut seen = String::new();
    while !seen.contains("first") {
        let frame = body.frame().await.expect("stream open").expect("frame ok");
        if let Ok(data) = frame.into_data() {
            seen.push_str(&String::from_utf8_lossy(&data));
        }
    }
    drop(body);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(
        !marker.exists(),
        "subprocess kept running after client disconnect"
    );
}

// ---------------------------------------------------------------------------
// Session correlation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_field_allocates_a_session_mapping() {
    let tmp = tempfile::tempdir().unwrap();
    let args_file = tmp.path().join("args.txt");
    let mock = write_mock(
        tmp.path(),
        &format!(
            "echo \"$@\" > {}\necho '{{\"type\":\"result\",\"result\":\"ok\"}}'",
            args_file.display()
        ),
    );
    let state = state_with(&tmp, &mock);
    let sessions = Arc::clone(&state.sessions);
    let app = build_app(state.clone());

    let resp = post_completions(
        app,
        json!({
            "user": "conv-42",
            "messages": [{"role": "user", "content": "hi"}]
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let entry = sessions.get("conv-42").await.expect("mapping created");
    let recorded = std::fs::read_to_string(&args_file).expect("args file");
    assert!(recorded.contains(&format!("--session-id {}", entry.claude_session_id)));

    // A second request reuses the same CLI session.
    let app = build_app(state);
    let resp = post_completions(
        app,
        json!({
            "user": "conv-42",
            "messages": [{"role": "user", "content": "again"}]
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let again = sessions.get("conv-42").await.expect("mapping kept");
    assert_eq!(again.claude_session_id, entry.claude_session_id);
}
