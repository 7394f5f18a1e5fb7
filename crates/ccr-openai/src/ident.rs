// SPDX-License-Identifier: MIT OR Apache-2.0
//! Id generation, timestamps, and model-name normalization.

use chrono::Utc;
use uuid::Uuid;

/// The three model ids the relay advertises, in listing order.
pub const MODEL_IDS: [&str; 3] = ["claude-opus-4", "claude-sonnet-4", "claude-haiku-4"];

/// Collapse an inbound model string to one of the relay's normalized ids.
///
/// Matching is by substring on `opus`/`sonnet`/`haiku`; anything else is
/// preserved unchanged.
#[must_use]
pub fn normalize_model_name(model: &str) -> String {
    let lower = model.to_ascii_lowercase();
    if lower.contains("opus") {
        "claude-opus-4".into()
    } else if lower.contains("sonnet") {
        "claude-sonnet-4".into()
    } else if lower.contains("haiku") {
        "claude-haiku-4".into()
    } else {
        model.to_string()
    }
}

/// A 24-character lowercase hex identifier, derived from a fresh UUID.
#[must_use]
pub fn request_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..24].to_string()
}

/// A completion id of the form `chatcmpl-<24 hex>`.
#[must_use]
pub fn completion_id() -> String {
    format!("chatcmpl-{}", request_id())
}

/// Current Unix time in whole seconds.
#[must_use]
pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
