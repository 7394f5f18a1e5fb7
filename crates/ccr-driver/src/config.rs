// SPDX-License-Identifier: MIT OR Apache-2.0
//! Driver configuration and the fixed CLI argument set.

use std::path::PathBuf;
use std::time::Duration;

/// Default subprocess timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for one CLI subprocess.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Executable name or path (default `"claude"`).
    pub claude_bin: String,
    /// Model alias passed to `--model` (`opus`, `sonnet`, or `haiku`).
    pub model: String,
    /// CLI session id passed to `--session-id`, when resuming a conversation.
    pub session_id: Option<String>,
    /// Working directory override for the subprocess.
    pub cwd: Option<PathBuf>,
    /// Maximum wall-clock time before the subprocess is terminated.
    pub timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            claude_bin: "claude".into(),
            model: "opus".into(),
            session_id: None,
            cwd: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DriverConfig {
    /// Create a config for the given model alias.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Override the executable name or path.
    #[must_use]
    pub fn with_claude_bin(mut self, bin: impl Into<String>) -> Self {
        self.claude_bin = bin.into();
        self
    }

    /// Resume the given CLI session.
    #[must_use]
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Set the working directory for the subprocess.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set the subprocess timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The fixed argument vector, sans the trailing prompt.
///
/// The exact flag set is part of the subprocess interface: `--print` for
/// non-interactive mode, `stream-json` line-delimited output, partial
/// messages for streaming deltas, and no CLI-side session persistence (the
/// relay owns the session mapping).
#[must_use]
pub fn build_args(config: &DriverConfig) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--print".into(),
        "--output-format".into(),
        "stream-json".into(),
        "--verbose".into(),
        "--include-partial-messages".into(),
        "--model".into(),
        config.model.clone(),
        "--no-session-persistence".into(),
    ];
    if let Some(id) = &config.session_id {
        args.push("--session-id".into());
        args.push(id.clone());
    }
    args
}
