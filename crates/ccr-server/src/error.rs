// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP-facing error type.
//!
//! Every subsystem error crosses into HTTP exactly here; once a response has
//! been committed, later errors go in-band or to the log instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ccr_driver::DriverError;
use ccr_openai::ErrorEnvelope;

/// An error envelope paired with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code.
    pub status: StatusCode,
    /// The OpenAI-shaped envelope.
    pub envelope: ErrorEnvelope,
}

impl ApiError {
    /// 400 — `messages` was missing, empty, or not an array.
    #[must_use]
    pub fn invalid_messages() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            envelope: ErrorEnvelope::invalid_request("messages must be a non-empty array")
                .with_code("invalid_messages"),
        }
    }

    /// 400 — the request body was not valid JSON.
    #[must_use]
    pub fn malformed_body(err: &serde_json::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            envelope: ErrorEnvelope::invalid_request(format!("invalid request body: {err}"))
                .with_code("invalid_json"),
        }
    }

    /// 404 — unknown route.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            envelope: ErrorEnvelope::not_found("unknown route"),
        }
    }

    /// 500 — upstream failure with a free-form message.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            envelope: ErrorEnvelope::server_error(message),
        }
    }

    /// 500 — the subprocess closed without a result.
    #[must_use]
    pub fn abnormal_exit(code: Option<i32>) -> Self {
        let message = match code {
            Some(code) => format!("claude CLI exited with code {code} before producing a result"),
            None => "claude CLI exited before producing a result".to_string(),
        };
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            envelope: ErrorEnvelope::server_error(message).with_code("upstream_exit"),
        }
    }

    /// Map a driver error to its HTTP form.
    #[must_use]
    pub fn from_driver(err: &DriverError) -> Self {
        let envelope = match err {
            DriverError::CliNotInstalled => {
                ErrorEnvelope::server_error(err.to_string()).with_code("cli_not_installed")
            }
            DriverError::Timeout { .. } => {
                ErrorEnvelope::server_error(err.to_string()).with_code("upstream_timeout")
            }
            DriverError::Spawn(_) => ErrorEnvelope::server_error(err.to_string()),
        };
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            envelope,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
