// SPDX-License-Identifier: MIT OR Apache-2.0
//! Idempotent kill signalling for the driver.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Notify;

/// One-way kill switch shared between the driver handle and its event loop.
///
/// Cloneable and backed by an `Arc`; tripping any clone wakes all waiters.
/// Tripping is idempotent — the first call wins, later calls are no-ops.
#[derive(Clone, Default)]
pub struct KillSwitch {
    tripped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl KillSwitch {
    /// Create a new, untripped switch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the switch. Returns `true` only for the call that tripped it.
    pub fn trip(&self) -> bool {
        let first = !self.tripped.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    /// Returns `true` once the switch has been tripped.
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Wait until the switch is tripped (immediate if it already is).
    pub async fn tripped(&self) {
        if self.is_tripped() {
            return;
        }
        self.notify.notified().await;
    }
}
