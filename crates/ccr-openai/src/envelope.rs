// SPDX-License-Identifier: MIT OR Apache-2.0
//! The OpenAI-style error envelope: `{"error": {message, type, code}}`.

use serde::{Deserialize, Serialize};

/// Top-level error envelope returned on any failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error payload.
    pub error: ErrorBody,
}

/// The payload inside an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub message: String,
    /// Error class (e.g. `"invalid_request_error"`, `"server_error"`).
    #[serde(rename = "type")]
    pub error_type: String,
    /// Stable machine-readable code, when one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorEnvelope {
    /// Create an envelope with the given class and message.
    #[must_use]
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
                error_type: error_type.into(),
                code: None,
            },
        }
    }

    /// Attach a stable code to this envelope.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error.code = Some(code.into());
        self
    }

    // -- Convenience constructors for stable error classes -------------------

    /// 400 — the request was malformed or invalid.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request_error", message)
    }

    /// 404 — unknown route.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("invalid_request_error", message).with_code("not_found")
    }

    /// 500 — upstream or internal failure.
    #[must_use]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new("server_error", message)
    }
}
