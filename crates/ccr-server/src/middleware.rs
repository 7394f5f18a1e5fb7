// SPDX-License-Identifier: MIT OR Apache-2.0
//! Middleware for the relay HTTP surface.

use std::time::Instant;

use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Maximum accepted JSON body size.
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Log method, path, status, and duration for each request.
pub async fn request_logger(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let start = Instant::now();

    let resp = next.run(req).await;

    info!(
        target: "ccr.http",
        http_method = %method,
        http_path = %path,
        http_status = resp.status().as_u16(),
        http_duration_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    resp
}

/// Permissive CORS: any origin, the three methods the surface uses, and the
/// headers OpenAI clients send.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
}
