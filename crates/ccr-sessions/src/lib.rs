// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Sessions expire this long after their last use.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Interval between background cleanup sweeps.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// File name of the mapping, relative to `$HOME`.
pub const SESSIONS_FILE: &str = ".claude-code-cli-sessions.json";

/// Errors from session store construction.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// `$HOME` is not set, so the default file location cannot be derived.
    #[error("HOME is not set; cannot locate the session file")]
    NoHome,
}

/// One persisted session mapping.
///
/// Field names are part of the on-disk format; timestamps are milliseconds
/// since the epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    /// The external conversation id this entry is keyed by.
    pub clawdbot_id: String,
    /// The CLI session id handed to `--session-id`.
    pub claude_session_id: String,
    /// Creation time, ms since epoch.
    pub created_at: i64,
    /// Last-use time, ms since epoch.
    pub last_used_at: i64,
    /// Last-known model alias for this conversation.
    pub model: String,
}

/// The conversation-id → CLI-session mapping.
///
/// Shared across requests behind an `Arc`; the in-memory map is the source
/// of truth and the file is a write-behind copy.
pub struct SessionStore {
    path: PathBuf,
    // `None` until the file has been loaded once.
    inner: Mutex<Option<HashMap<String, SessionEntry>>>,
}

impl SessionStore {
    /// Open the store at its default location under `$HOME`.
    pub fn new() -> Result<Self, SessionStoreError> {
        let home = std::env::var_os("HOME").ok_or(SessionStoreError::NoHome)?;
        Ok(Self::with_path(PathBuf::from(home).join(SESSIONS_FILE)))
    }

    /// Open a store backed by an explicit file path (test seam).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            inner: Mutex::new(None),
        }
    }

    /// Look up the mapping for `conversation_id`, creating one with a fresh
    /// CLI session id if none exists. Bumps `lastUsedAt` and the last-known
    /// model either way.
    pub async fn get_or_create(&self, conversation_id: &str, model: &str) -> SessionEntry {
        let mut guard = self.inner.lock().await;
        let map = Self::loaded(&self.path, &mut guard).await;

        let now = now_ms();
        let entry = map
            .entry(conversation_id.to_string())
            .and_modify(|e| {
                e.last_used_at = now.max(e.last_used_at + 1);
                e.model = model.to_string();
            })
            .or_insert_with(|| SessionEntry {
                clawdbot_id: conversation_id.to_string(),
                claude_session_id: Uuid::new_v4().to_string(),
                created_at: now,
                last_used_at: now,
                model: model.to_string(),
            })
            .clone();

        self.persist(map);
        entry
    }

    /// Look up an existing mapping without touching it.
    pub async fn get(&self, conversation_id: &str) -> Option<SessionEntry> {
        let mut guard = self.inner.lock().await;
        let map = Self::loaded(&self.path, &mut guard).await;
        map.get(conversation_id).cloned()
    }

    /// Delete a mapping. Returns `true` if one existed.
    pub async fn delete(&self, conversation_id: &str) -> bool {
        let mut guard = self.inner.lock().await;
        let map = Self::loaded(&self.path, &mut guard).await;
        let removed = map.remove(conversation_id).is_some();
        if removed {
            self.persist(map);
        }
        removed
    }

    /// Drop every entry whose last use is older than [`SESSION_TTL`].
    /// Returns the number of expired entries.
    pub async fn cleanup(&self) -> usize {
        let mut guard = self.inner.lock().await;
        let map = Self::loaded(&self.path, &mut guard).await;

        let cutoff = now_ms() - SESSION_TTL.as_millis() as i64;
        let before = map.len();
        map.retain(|_, entry| entry.last_used_at >= cutoff);
        let expired = before - map.len();

        if expired > 0 {
            debug!(target: "ccr.sessions", expired, "expired stale sessions");
            self.persist(map);
        }
        expired
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let mut guard = self.inner.lock().await;
        Self::loaded(&self.path, &mut guard).await.len()
    }

    /// Returns `true` when the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Await completion of any in-flight write by rewriting synchronously.
    ///
    /// Mutations persist fire-and-forget; tests and shutdown paths call this
    /// to get a deterministic on-disk state.
    pub async fn flush(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(map) = guard.as_mut() {
            write_file(&self.path, map).await;
        }
    }

    /// Spawn the hourly TTL sweep for this store.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
            ticker.tick().await; // the first tick is immediate
            loop {
                ticker.tick().await;
                store.cleanup().await;
            }
        })
    }

    /// Ensure the map is loaded, tolerating a missing or malformed file.
    async fn loaded<'a>(
        path: &Path,
        guard: &'a mut Option<HashMap<String, SessionEntry>>,
    ) -> &'a mut HashMap<String, SessionEntry> {
        match guard {
            Some(map) => map,
            None => {
                let map = match tokio::fs::read(path).await {
                    Ok(bytes) => match serde_json::from_slice(&bytes) {
                        Ok(map) => map,
                        Err(err) => {
                            warn!(target: "ccr.sessions", %err, "session file malformed; starting empty");
                            HashMap::new()
                        }
                    },
                    Err(_) => HashMap::new(),
                };
                guard.insert(map)
            }
        }
    }

    /// Fire-and-forget whole-file rewrite.
    fn persist(&self, map: &HashMap<String, SessionEntry>) {
        let path = self.path.clone();
        let snapshot = map.clone();
        tokio::spawn(async move {
            write_file(&path, &snapshot).await;
        });
    }
}

async fn write_file(path: &Path, map: &HashMap<String, SessionEntry>) {
    match serde_json::to_vec_pretty(map) {
        Ok(bytes) => {
            if let Err(err) = tokio::fs::write(path, bytes).await {
                warn!(target: "ccr.sessions", %err, path = %path.display(), "session file write failed");
            }
        }
        Err(err) => warn!(target: "ccr.sessions", %err, "session map serialization failed"),
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_uses_the_on_disk_field_names() {
        let entry = SessionEntry {
            clawdbot_id: "conv".into(),
            claude_session_id: "sess".into(),
            created_at: 1,
            last_used_at: 2,
            model: "sonnet".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["clawdbotId"], "conv");
        assert_eq!(json["claudeSessionId"], "sess");
        assert_eq!(json["createdAt"], 1);
        assert_eq!(json["lastUsedAt"], 2);
        assert_eq!(json["model"], "sonnet");
    }

    #[test]
    fn ttl_and_interval_constants() {
        assert_eq!(SESSION_TTL, Duration::from_secs(86_400));
        assert_eq!(CLEANUP_INTERVAL, Duration::from_secs(3_600));
    }
}
