// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subprocess spawning, stdout framing, and the event loop.

use std::process::Stdio;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use ccr_stream::{classify, CliEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::{build_args, DriverConfig};
use crate::error::DriverError;
use crate::event::DriverEvent;
use crate::kill::KillSwitch;

/// Handle to one running CLI subprocess.
///
/// Single-shot: spawn once, then consume events via [`CliDriver::recv`]
/// until [`DriverEvent::Close`]. Dropping the handle kills the subprocess.
pub struct CliDriver {
    events: mpsc::Receiver<DriverEvent>,
    kill: KillSwitch,
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for CliDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliDriver")
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl CliDriver {
    /// Spawn the CLI for the given prompt.
    ///
    /// The prompt is passed as the final positional argument — never through
    /// a shell — and stdin is closed immediately. A missing executable is
    /// reported as [`DriverError::CliNotInstalled`]; any other spawn failure
    /// is surfaced verbatim.
    pub fn spawn(prompt: &str, config: &DriverConfig) -> Result<Self, DriverError> {
        let mut cmd = Command::new(&config.claude_bin);
        cmd.args(build_args(config))
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                DriverError::CliNotInstalled
            } else {
                DriverError::Spawn(err)
            }
        })?;

        debug!(
            target: "ccr.driver",
            bin = %config.claude_bin,
            model = %config.model,
            session = ?config.session_id,
            "spawned claude CLI"
        );

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Forward stderr via tracing; the CLI writes diagnostics there.
        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            let s = line.trim_end();
                            if !s.is_empty() {
                                warn!(target: "ccr.driver.stderr", "{s}");
                            }
                        }
                    }
                }
            });
        }

        let (tx, rx) = mpsc::channel(256);
        let kill = KillSwitch::new();
        let running = Arc::new(AtomicBool::new(true));

        let loop_kill = kill.clone();
        let loop_running = Arc::clone(&running);
        let timeout = config.timeout;
        tokio::spawn(async move {
            event_loop(child, stdout, tx, loop_kill, loop_running, timeout).await;
        });

        Ok(Self {
            events: rx,
            kill,
            running,
        })
    }

    /// Receive the next event, or `None` once the channel has drained past
    /// [`DriverEvent::Close`].
    pub async fn recv(&mut self) -> Option<DriverEvent> {
        self.events.recv().await
    }

    /// Terminate the subprocess. Idempotent; the terminate signal is sent
    /// exactly once and the timeout timer is disarmed.
    pub fn kill(&self) {
        self.kill.trip();
    }

    /// Returns `true` while the subprocess has not yet been reaped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for CliDriver {
    fn drop(&mut self) {
        self.kill.trip();
    }
}

/// The per-subprocess event loop: frames stdout lines, enforces the timeout,
/// and emits [`DriverEvent::Close`] exactly once after reaping the child.
async fn event_loop(
    mut child: Child,
    stdout: Option<tokio::process::ChildStdout>,
    tx: mpsc::Sender<DriverEvent>,
    kill: KillSwitch,
    running: Arc<AtomicBool>,
    timeout: std::time::Duration,
) {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    // Once terminating, the remaining frames are drained to EOF without
    // re-polling the timer or the kill switch.
    let mut terminating = false;

    if let Some(stdout) = stdout {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        loop {
            line.clear();
            tokio::select! {
                () = kill.tripped(), if !terminating => {
                    terminating = true;
                    let _ = child.start_kill();
                }
                () = &mut deadline, if !terminating => {
                    terminating = true;
                    kill.trip();
                    let _ = child.start_kill();
                    let _ = tx
                        .send(DriverEvent::Error(DriverError::Timeout { after: timeout }))
                        .await;
                }
                read = reader.read_line(&mut line) => match read {
                    Ok(0) => break,
                    Ok(_) => {
                        if let Some(event) = frame_line(&line) {
                            if tx.send(event).await.is_err() {
                                // Receiver dropped: reap and stop.
                                let _ = child.start_kill();
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        warn!(target: "ccr.driver", %err, "stdout read failed");
                        break;
                    }
                },
            }
        }
    }

    let code = child.wait().await.ok().and_then(|status| status.code());
    running.store(false, Ordering::SeqCst);
    debug!(target: "ccr.driver", ?code, "claude CLI closed");
    let _ = tx.send(DriverEvent::Close(code)).await;
}

/// Frame one stdout line into an event.
///
/// `read_line` already splits on newline and hands back the trailing partial
/// line at EOF, so every line lands here exactly once. Empty lines are
/// dropped; unparseable lines become [`DriverEvent::Raw`] and never abort
/// framing.
fn frame_line(line: &str) -> Option<DriverEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => Some(match classify(value) {
            CliEvent::Delta { text } => DriverEvent::ContentDelta(text),
            CliEvent::Assistant(ev) => DriverEvent::Assistant(ev),
            CliEvent::Result(ev) => DriverEvent::Result(ev),
            other => DriverEvent::Message(other),
        }),
        Err(_) => Some(DriverEvent::Raw(trimmed.to_string())),
    }
}
