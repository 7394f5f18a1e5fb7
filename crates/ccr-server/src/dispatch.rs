// SPDX-License-Identifier: MIT OR Apache-2.0
//! The response dispatcher: one handler, three modes.
//!
//! Mode selection is by `(tools active, stream requested)`. Tools force the
//! buffered-replay path because `finish_reason` cannot be rewritten once a
//! chunk is on the wire, and whether the response contains tool calls is
//! knowable only from the complete text.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ccr_driver::{CliDriver, DriverConfig, DriverError, DriverEvent};
use ccr_openai::{
    normalize_model_name, request_id, completion_id, unix_now, ChatCompletionRequest,
    ErrorEnvelope,
};
use ccr_prompt::{parse_tool_calls, translate};
use ccr_stream::ResultEvent;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::ApiError;
use crate::respond;
use crate::AppState;

type Frame = Result<Bytes, Infallible>;

/// `POST /v1/chat/completions`.
///
/// The body is parsed by hand so malformed JSON gets the same envelope
/// shape as every other error.
pub async fn chat_completions(State(state): State<AppState>, body: Bytes) -> Response {
    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(err) => return ApiError::malformed_body(&err).into_response(),
    };
    if req.messages.is_empty() {
        return ApiError::invalid_messages().into_response();
    }

    let invocation = translate(&req);

    let mut config = DriverConfig::new(invocation.model.as_cli_arg())
        .with_claude_bin(state.claude_bin.clone())
        .with_timeout(state.timeout);
    if let Some(key) = &invocation.session_key {
        let entry = state
            .sessions
            .get_or_create(key, invocation.model.as_cli_arg())
            .await;
        config = config.with_session_id(entry.claude_session_id);
    }

    let driver = match CliDriver::spawn(&invocation.prompt, &config) {
        Ok(driver) => driver,
        Err(err) => return ApiError::from_driver(&err).into_response(),
    };

    debug!(
        target: "ccr.dispatch",
        tools = invocation.tools_active,
        stream = req.wants_stream(),
        "dispatching request"
    );

    match (invocation.tools_active, req.wants_stream()) {
        (true, stream) => buffered_replay(driver, stream).await,
        (false, true) => passthrough_stream(driver, &req),
        (false, false) => non_streaming(driver).await,
    }
}

// ---------------------------------------------------------------------------
// Non-streaming
// ---------------------------------------------------------------------------

/// Wait for the terminal result, answer with one JSON body.
async fn non_streaming(mut driver: CliDriver) -> Response {
    let mut result: Option<ResultEvent> = None;

    loop {
        match driver.recv().await {
            Some(DriverEvent::Result(r)) => result = Some(r),
            Some(DriverEvent::Error(err)) => {
                // The error wins; any later result is suppressed.
                return ApiError::from_driver(&err).into_response();
            }
            Some(DriverEvent::Close(code)) => {
                return match result {
                    Some(r) => {
                        let resp =
                            respond::completion_from_result(&completion_id(), unix_now(), &r);
                        Json(resp).into_response()
                    }
                    None => ApiError::abnormal_exit(code).into_response(),
                };
            }
            Some(_) => {}
            None => return ApiError::upstream("event stream ended unexpectedly").into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pass-through streaming
// ---------------------------------------------------------------------------

/// Forward each upstream delta as one SSE chunk.
///
/// The writer task detects client disconnect through the response body being
/// dropped (send failure) and kills the subprocess; the request-side close
/// signal is deliberately not used.
fn passthrough_stream(mut driver: CliDriver, req: &ChatCompletionRequest) -> Response {
    let id = completion_id();
    let created = unix_now();
    let mut model = normalize_model_name(req.model.as_deref().unwrap_or(respond::FALLBACK_MODEL));

    let (tx, rx) = mpsc::channel::<Frame>(64);

    tokio::spawn(async move {
        if tx.send(Ok(Bytes::from_static(respond::SSE_OK))).await.is_err() {
            driver.kill();
            return;
        }

        let mut sent_role = false;
        loop {
            // The body stream being dropped is the disconnect signal; the
            // request side closing is not (it fires at end-of-body).
            let event = tokio::select! {
                () = tx.closed() => {
                    driver.kill();
                    return;
                }
                event = driver.recv() => match event {
                    Some(event) => event,
                    None => return,
                },
            };
            match event {
                DriverEvent::ContentDelta(text) => {
                    let with_role = !sent_role && !text.is_empty();
                    sent_role = sent_role || with_role;
                    let chunk = respond::content_chunk(&id, created, &model, &text, with_role);
                    if tx.send(Ok(respond::sse_frame(&chunk))).await.is_err() {
                        driver.kill();
                        return;
                    }
                }
                DriverEvent::Assistant(ev) => {
                    if let Some(m) = &ev.message.model {
                        model = m.clone();
                    }
                }
                DriverEvent::Result(_) => {
                    let done = respond::done_chunk(&id, created, &model, "stop");
                    let _ = tx.send(Ok(respond::sse_frame(&done))).await;
                    let _ = tx.send(Ok(Bytes::from_static(respond::SSE_DONE))).await;
                    return;
                }
                DriverEvent::Error(err) => {
                    // Headers are already committed: report in-band.
                    let envelope = error_envelope(&err);
                    let _ = tx.send(Ok(respond::sse_frame(&envelope))).await;
                    let _ = tx.send(Ok(Bytes::from_static(respond::SSE_DONE))).await;
                    return;
                }
                DriverEvent::Close(_) => {
                    let _ = tx.send(Ok(Bytes::from_static(respond::SSE_DONE))).await;
                    return;
                }
                _ => {}
            }
        }
    });

    sse_response(Body::from_stream(ReceiverStream::new(rx)))
}

// ---------------------------------------------------------------------------
// Buffered replay (tools active)
// ---------------------------------------------------------------------------

/// Withhold all output until the subprocess closes, classify the final text,
/// then emit either a JSON body or a replayed SSE sequence.
async fn buffered_replay(mut driver: CliDriver, stream: bool) -> Response {
    let mut buffer = String::new();
    let mut assistant_model: Option<String> = None;
    let mut result: Option<ResultEvent> = None;
    let mut driver_err: Option<DriverError> = None;
    let mut close_code: Option<i32> = None;

    while let Some(event) = driver.recv().await {
        match event {
            DriverEvent::ContentDelta(text) => buffer.push_str(&text),
            DriverEvent::Assistant(ev) => {
                if let Some(m) = &ev.message.model {
                    assistant_model = Some(m.clone());
                }
            }
            DriverEvent::Result(r) => result = Some(r),
            DriverEvent::Error(err) => driver_err = Some(err),
            DriverEvent::Close(code) => {
                close_code = code;
                break;
            }
            _ => {}
        }
    }

    if let Some(err) = &driver_err {
        return if stream {
            replay_error(&error_envelope(err))
        } else {
            ApiError::from_driver(err).into_response()
        };
    }

    // Authoritative text: the terminal result wins, the accumulated buffer
    // is the fallback.
    let text = match result.as_ref().and_then(|r| r.result.clone()) {
        Some(text) => text,
        None => buffer,
    };
    if result.is_none() && text.is_empty() {
        return if stream {
            replay_error(&ApiError::abnormal_exit(close_code).envelope)
        } else {
            ApiError::abnormal_exit(close_code).into_response()
        };
    }

    let parsed = parse_tool_calls(&text);
    let id = completion_id();
    let created = unix_now();
    let model = respond::replay_model(result.as_ref(), assistant_model.as_deref()).to_string();

    if stream {
        let chunks = if parsed.has_tool_calls() {
            respond::tool_call_chunks(&id, created, &model, &parsed)
        } else {
            respond::text_replay_chunks(&id, created, &model, &text)
        };
        let mut frames: Vec<Frame> = Vec::with_capacity(chunks.len() + 2);
        frames.push(Ok(Bytes::from_static(respond::SSE_OK)));
        frames.extend(chunks.iter().map(|c| Ok(respond::sse_frame(c))));
        frames.push(Ok(Bytes::from_static(respond::SSE_DONE)));
        sse_response(Body::from_stream(tokio_stream::iter(frames)))
    } else if parsed.has_tool_calls() {
        let resp = respond::tool_call_completion(&id, created, &model, &parsed, result.as_ref());
        Json(resp).into_response()
    } else {
        let resp = match result {
            Some(r) => respond::completion_from_result(&id, created, &r),
            None => respond::completion_from_text(&id, created, &model, &text),
        };
        Json(resp).into_response()
    }
}

/// A complete SSE stream carrying only an error envelope.
fn replay_error(envelope: &ErrorEnvelope) -> Response {
    let frames: Vec<Frame> = vec![
        Ok(Bytes::from_static(respond::SSE_OK)),
        Ok(respond::sse_frame(envelope)),
        Ok(Bytes::from_static(respond::SSE_DONE)),
    ];
    sse_response(Body::from_stream(tokio_stream::iter(frames)))
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

fn error_envelope(err: &DriverError) -> ErrorEnvelope {
    ApiError::from_driver(err).envelope
}

/// SSE response headers, flushed ahead of the first frame.
fn sse_response(body: Body) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("x-request-id", request_id())
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
