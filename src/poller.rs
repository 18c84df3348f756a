// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Snapshot Refresh Poller
//!
//! Background task that keeps the record repository's projection warm by
//! periodically rebuilding it from the ledger. Refresh coalescing makes
//! overlap with user-triggered refreshes safe: whichever side gets there
//! first wins the cycle and the other becomes a no-op.
//!
//! Background failures are logged, never pushed to the transaction status
//! channel; that slot belongs to user-triggered operations.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ledger::LedgerStore;
use crate::repository::{RecordRepository, RefreshOutcome};

/// Default interval between refresh sweeps.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Background poller that refreshes the record snapshot.
pub struct RefreshPoller<L> {
    ledger: Arc<L>,
    repository: Arc<RecordRepository>,
    poll_interval: Duration,
}

impl<L: LedgerStore + 'static> RefreshPoller<L> {
    /// Create a new poller with the default interval.
    pub fn new(ledger: Arc<L>, repository: Arc<RecordRepository>) -> Self {
        Self {
            ledger,
            repository,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll interval.
    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the poller loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(poller.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Snapshot refresh poller starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Snapshot refresh poller shutting down");
                return;
            }

            self.poll_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Snapshot refresh poller shutting down");
                    return;
                }
            }
        }
    }

    async fn poll_step(&self) {
        match self.repository.refresh(self.ledger.as_ref()).await {
            Ok(RefreshOutcome::Refreshed { total, dropped }) => {
                debug!(total, dropped, "Background snapshot refresh complete");
            }
            Ok(RefreshOutcome::AlreadyInFlight) => {
                debug!("Background refresh skipped, another refresh in flight");
            }
            Err(e) => {
                warn!(error = %e, "Background snapshot refresh failed, will retry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{sample_record, FakeLedger};

    #[tokio::test(start_paused = true)]
    async fn poller_refreshes_until_cancelled() {
        let ledger = Arc::new(FakeLedger::with_records(vec![sample_record("r1")]));
        let repository = Arc::new(RecordRepository::new());
        let shutdown = CancellationToken::new();

        let poller = RefreshPoller::new(Arc::clone(&ledger), Arc::clone(&repository))
            .with_interval(Duration::from_secs(5));
        let handle = tokio::spawn(poller.run(shutdown.clone()));

        // First sweep runs immediately; two more after the interval elapses twice.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ledger.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(repository.records().await.len(), 1);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(ledger.list_calls.load(Ordering::SeqCst), 3);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failures_are_retried_next_sweep() {
        let ledger = Arc::new(FakeLedger::with_records(vec![sample_record("r1")]));
        ledger.fail_listing.store(true, Ordering::SeqCst);
        let repository = Arc::new(RecordRepository::new());
        let shutdown = CancellationToken::new();

        let poller = RefreshPoller::new(Arc::clone(&ledger), Arc::clone(&repository))
            .with_interval(Duration::from_secs(5));
        let handle = tokio::spawn(poller.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(repository.records().await.is_empty());

        // Recovery on the next sweep.
        ledger.fail_listing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(repository.records().await.len(), 1);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
