// SPDX-License-Identifier: MIT OR Apache-2.0
//! Model alias resolution.
//!
//! The CLI accepts only the short aliases `opus`, `sonnet`, and `haiku`;
//! inbound requests may name any of the canonical, dated, or
//! provider-prefixed forms.

/// The three model aliases the CLI accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelAlias {
    /// The largest model.
    #[default]
    Opus,
    /// The mid-tier model.
    Sonnet,
    /// The fastest model.
    Haiku,
}

impl ModelAlias {
    /// The value passed to the CLI's `--model` flag.
    #[must_use]
    pub fn as_cli_arg(&self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Sonnet => "sonnet",
            Self::Haiku => "haiku",
        }
    }

    /// The normalized OpenAI-facing model id for this alias.
    #[must_use]
    pub fn normalized_id(&self) -> &'static str {
        match self {
            Self::Opus => "claude-opus-4",
            Self::Sonnet => "claude-sonnet-4",
            Self::Haiku => "claude-haiku-4",
        }
    }
}

/// The closed resolution table: canonical names, dated releases, and short
/// aliases. Provider prefixes are handled by [`resolve_model`].
fn lookup(name: &str) -> Option<ModelAlias> {
    match name {
        "opus" | "claude-opus-4" | "claude-opus-4-0" | "claude-opus-4-20250514"
        | "claude-opus-4-1" | "claude-3-opus" | "claude-3-opus-20240229" => Some(ModelAlias::Opus),
        "sonnet" | "claude-sonnet-4" | "claude-sonnet-4-0" | "claude-sonnet-4-20250514"
        | "claude-3-5-sonnet" | "claude-3-5-sonnet-20241022" | "claude-3-7-sonnet"
        | "claude-3-7-sonnet-20250219" => Some(ModelAlias::Sonnet),
        "haiku" | "claude-haiku-4" | "claude-3-5-haiku" | "claude-3-5-haiku-20241022"
        | "claude-3-haiku" | "claude-3-haiku-20240307" => Some(ModelAlias::Haiku),
        _ => None,
    }
}

/// Resolve an inbound model string to a CLI alias.
///
/// Provider-prefixed forms (`<provider>/<name>`) are retried once with the
/// prefix stripped. Unknown names and an absent model both resolve to
/// [`ModelAlias::Opus`].
#[must_use]
pub fn resolve_model(name: Option<&str>) -> ModelAlias {
    let Some(name) = name else {
        return ModelAlias::Opus;
    };
    lookup(name)
        .or_else(|| name.split_once('/').and_then(|(_, rest)| lookup(rest)))
        .unwrap_or(ModelAlias::Opus)
}
