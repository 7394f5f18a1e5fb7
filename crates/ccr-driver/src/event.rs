// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed events emitted on the driver channel.

use ccr_stream::{AssistantEvent, CliEvent, ResultEvent};

use crate::error::DriverError;

/// One event on the driver's channel.
///
/// Every stdout frame yields exactly one event: the kinds the dispatcher
/// acts on are pre-classified, all other parsed frames arrive as
/// [`DriverEvent::Message`], and unparseable lines arrive as
/// [`DriverEvent::Raw`]. [`DriverEvent::Close`] is always the final event.
#[derive(Debug)]
pub enum DriverEvent {
    /// An incremental text fragment.
    ContentDelta(String),
    /// A complete assistant message.
    Assistant(AssistantEvent),
    /// The terminal result.
    Result(ResultEvent),
    /// Any other parsed frame (init, hooks, user echoes, …).
    Message(CliEvent),
    /// A stdout line that did not parse as JSON.
    Raw(String),
    /// A driver-level failure (currently only the timeout).
    Error(DriverError),
    /// The subprocess closed with the given exit code.
    Close(Option<i32>),
}

impl DriverEvent {
    /// Returns `true` for the terminal [`DriverEvent::Close`] event.
    #[must_use]
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }
}
