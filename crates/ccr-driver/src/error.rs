// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for driver operations.

use std::time::Duration;
use thiserror::Error;

/// Errors from spawning and supervising the CLI subprocess.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The CLI executable was not found on PATH.
    #[error(
        "claude CLI not found; install it with `npm install -g @anthropic-ai/claude-code` \
         and make sure `claude` is on your PATH"
    )]
    CliNotInstalled,

    /// Any other spawn failure, surfaced verbatim.
    #[error("failed to spawn claude CLI: {0}")]
    Spawn(#[source] std::io::Error),

    /// The subprocess exceeded the request timeout and was terminated.
    #[error("claude CLI timed out after {after:?}")]
    Timeout {
        /// The configured timeout that expired.
        after: Duration,
    },
}
