// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-slot transaction status channel.
//!
//! Every asynchronous operation reports its pending/success/error outcome
//! here. The slot is process-wide and last-write-wins: a newer event
//! overwrites whatever is showing, and each terminal event schedules its
//! own auto-clear, superseding any timer from a previous event. Pending
//! events have no timer; they are always replaced by a terminal outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::{StatusKind, TransactionStatus};

/// Clear delay for success events.
const SUCCESS_CLEAR_DELAY: Duration = Duration::from_secs(2);

/// Clear delay for error events.
const ERROR_CLEAR_DELAY: Duration = Duration::from_secs(3);

struct StatusInner {
    slot: Mutex<TransactionStatus>,
    /// Bumped on every show; a clear timer only fires if its epoch is
    /// still current, so superseded timers become no-ops.
    epoch: AtomicU64,
    success_delay: Duration,
    error_delay: Duration,
}

/// Handle to the process-wide status slot. Cheap to clone.
#[derive(Clone)]
pub struct StatusChannel {
    inner: Arc<StatusInner>,
}

impl StatusChannel {
    /// Channel with the production clear delays (2 s success, 3 s error).
    pub fn new() -> Self {
        Self::with_delays(SUCCESS_CLEAR_DELAY, ERROR_CLEAR_DELAY)
    }

    /// Channel with custom clear delays.
    pub fn with_delays(success_delay: Duration, error_delay: Duration) -> Self {
        Self {
            inner: Arc::new(StatusInner {
                slot: Mutex::new(TransactionStatus::hidden()),
                epoch: AtomicU64::new(0),
                success_delay,
                error_delay,
            }),
        }
    }

    /// Show a pending status. Stays visible until superseded.
    pub fn pending(&self, message: impl Into<String>) {
        self.show(StatusKind::Pending, message.into(), None);
    }

    /// Show a success status that auto-clears.
    pub fn success(&self, message: impl Into<String>) {
        self.show(
            StatusKind::Success,
            message.into(),
            Some(self.inner.success_delay),
        );
    }

    /// Show an error status that auto-clears.
    pub fn error(&self, message: impl Into<String>) {
        self.show(
            StatusKind::Error,
            message.into(),
            Some(self.inner.error_delay),
        );
    }

    /// Current slot contents.
    pub fn snapshot(&self) -> TransactionStatus {
        self.inner
            .slot
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or_default()
    }

    fn show(&self, status: StatusKind, message: String, clear_after: Option<Duration>) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        if let Ok(mut slot) = self.inner.slot.lock() {
            *slot = TransactionStatus {
                visible: true,
                status,
                message,
            };
        }

        if let Some(delay) = clear_after {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if inner.epoch.load(Ordering::SeqCst) != epoch {
                    // Superseded by a newer event; its timer owns the slot now.
                    return;
                }
                if let Ok(mut slot) = inner.slot.lock() {
                    *slot = TransactionStatus::hidden();
                }
            });
        }
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn success_auto_clears_within_delay_window() {
        let channel = StatusChannel::new();
        channel.success("X");

        let shown = channel.snapshot();
        assert!(shown.visible);
        assert_eq!(shown.status, StatusKind::Success);
        assert_eq!(shown.message, "X");

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(!channel.snapshot().visible);
    }

    #[tokio::test(start_paused = true)]
    async fn error_clears_after_longer_delay() {
        let channel = StatusChannel::new();
        channel.error("boom");

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(channel.snapshot().visible, "error still showing at 2.5s");

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!channel.snapshot().visible);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_show_supersedes_pending_clear() {
        let channel = StatusChannel::new();
        channel.success("first");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        channel.success("second");

        // The first event's timer fires at 2s and must not clear the slot.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let shown = channel.snapshot();
        assert!(shown.visible);
        assert_eq!(shown.message, "second");

        // The second event's own timer clears at 3.5s.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!channel.snapshot().visible);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_has_no_timer() {
        let channel = StatusChannel::new();
        channel.pending("working...");

        tokio::time::sleep(Duration::from_secs(10)).await;
        let shown = channel.snapshot();
        assert!(shown.visible);
        assert_eq!(shown.status, StatusKind::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn last_write_wins_without_queueing() {
        let channel = StatusChannel::new();
        channel.pending("submitting");
        channel.error("failed");

        let shown = channel.snapshot();
        assert_eq!(shown.status, StatusKind::Error);
        assert_eq!(shown.message, "failed");
    }
}
