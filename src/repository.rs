// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory projection of the ledger's record set.
//!
//! The repository is a full snapshot, not an incremental cache: every
//! refresh discards and rebuilds the set from the ledger's current
//! listing, so records removed upstream disappear on the next refresh.
//! Only `refresh()` writes the snapshot; filtering and aggregation are
//! pure reads over it.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::ledger::{LedgerError, LedgerStore};
use crate::models::{TaxRecord, TaxStats};

/// Result of a refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot was rebuilt. `dropped` counts records whose per-record
    /// fetch failed and were omitted.
    Refreshed { total: usize, dropped: usize },
    /// Another refresh was already in flight; this call was a no-op.
    AlreadyInFlight,
}

/// Snapshot store for all records fetched from the ledger.
pub struct RecordRepository {
    snapshot: RwLock<Vec<TaxRecord>>,
    refreshing: AtomicBool,
}

impl RecordRepository {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Vec::new()),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Rebuild the snapshot from the ledger's current listing.
    ///
    /// Overlapping calls coalesce: while one refresh is in flight, further
    /// calls return [`RefreshOutcome::AlreadyInFlight`] without touching
    /// the ledger. A listing-level failure leaves the prior snapshot
    /// unchanged; individual record failures drop just that record.
    pub async fn refresh<L: LedgerStore>(
        &self,
        ledger: &L,
    ) -> Result<RefreshOutcome, LedgerError> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Refresh already in flight, coalescing");
            return Ok(RefreshOutcome::AlreadyInFlight);
        }

        let result = self.rebuild(ledger).await;
        self.refreshing.store(false, Ordering::SeqCst);
        result
    }

    async fn rebuild<L: LedgerStore>(&self, ledger: &L) -> Result<RefreshOutcome, LedgerError> {
        let ids = ledger.list_record_ids().await?;

        let mut records = Vec::with_capacity(ids.len());
        let mut dropped = 0usize;
        for id in ids {
            match ledger.record(&id).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    dropped += 1;
                    warn!(record_id = %id, error = %e, "Failed to load record, omitting from snapshot");
                }
            }
        }

        let total = records.len();
        *self.snapshot.write().await = records;
        debug!(total, dropped, "Record snapshot rebuilt");

        Ok(RefreshOutcome::Refreshed { total, dropped })
    }

    /// Whether a refresh is currently in flight. Callers use this to
    /// disable concurrent refresh triggers.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    /// The full snapshot, in listing order.
    pub async fn records(&self) -> Vec<TaxRecord> {
        self.snapshot.read().await.clone()
    }

    /// Look up one record by id.
    pub async fn find(&self, id: &str) -> Option<TaxRecord> {
        self.snapshot
            .read()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Case-insensitive substring match over name and description.
    ///
    /// An empty query returns the full snapshot unchanged in order.
    pub async fn filter(&self, query: &str) -> Vec<TaxRecord> {
        let needle = query.to_lowercase();
        self.snapshot
            .read()
            .await
            .iter()
            .filter(|record| {
                record.name.to_lowercase().contains(&needle)
                    || record.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Aggregate statistics over the current snapshot.
    ///
    /// `total_income` sums `decrypted_value` across all records; an
    /// unverified record contributes zero until proved.
    pub async fn aggregate(&self) -> TaxStats {
        let snapshot = self.snapshot.read().await;

        if snapshot.is_empty() {
            return TaxStats::empty();
        }

        let total_deduction: u64 = snapshot.iter().map(|r| r.public_deduction).sum();

        TaxStats {
            total_records: snapshot.len(),
            verified_records: snapshot.iter().filter(|r| r.is_verified).count(),
            total_income: snapshot.iter().map(|r| r.decrypted_value).sum(),
            avg_deduction: total_deduction as f64 / snapshot.len() as f64,
        }
    }
}

impl Default for RecordRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::testing::{sample_record, FakeLedger};

    #[tokio::test]
    async fn refresh_builds_snapshot_in_listing_order() {
        let ledger = FakeLedger::with_records(vec![
            sample_record("r1"),
            sample_record("r2"),
            sample_record("r3"),
        ]);
        let repo = RecordRepository::new();

        let outcome = repo.refresh(&ledger).await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed {
                total: 3,
                dropped: 0
            }
        );

        let ids: Vec<String> = repo.records().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn per_record_failures_are_dropped_not_escalated() {
        let ledger = FakeLedger::with_records(vec![sample_record("ok"), sample_record("bad")]);
        ledger.fail_record("bad");
        let repo = RecordRepository::new();

        let outcome = repo.refresh(&ledger).await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed {
                total: 1,
                dropped: 1
            }
        );
        assert!(repo.find("bad").await.is_none());
        assert!(repo.find("ok").await.is_some());
    }

    #[tokio::test]
    async fn listing_failure_keeps_prior_snapshot() {
        let ledger = FakeLedger::with_records(vec![sample_record("r1")]);
        let repo = RecordRepository::new();
        repo.refresh(&ledger).await.unwrap();

        ledger.fail_listing.store(true, Ordering::SeqCst);
        let err = repo.refresh(&ledger).await;
        assert!(err.is_err());

        // Prior snapshot survives the top-level failure.
        assert_eq!(repo.records().await.len(), 1);
        assert!(!repo.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_refreshes_coalesce_to_one_fetch_cycle() {
        let ledger = Arc::new(FakeLedger::with_records(vec![sample_record("r1")]));
        ledger.set_list_delay(Duration::from_millis(100));
        let repo = Arc::new(RecordRepository::new());

        let first = {
            let (repo, ledger) = (Arc::clone(&repo), Arc::clone(&ledger));
            tokio::spawn(async move { repo.refresh(ledger.as_ref()).await })
        };

        // Let the first refresh reach its in-flight fetch.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(repo.is_refreshing());

        let second = repo.refresh(ledger.as_ref()).await.unwrap();
        assert_eq!(second, RefreshOutcome::AlreadyInFlight);

        let first = first.await.unwrap().unwrap();
        assert_eq!(
            first,
            RefreshOutcome::Refreshed {
                total: 1,
                dropped: 0
            }
        );
        assert_eq!(ledger.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(repo.records().await.len(), 1);
    }

    #[tokio::test]
    async fn empty_filter_returns_full_snapshot_in_order() {
        let ledger = FakeLedger::with_records(vec![sample_record("a"), sample_record("b")]);
        let repo = RecordRepository::new();
        repo.refresh(&ledger).await.unwrap();

        let all = repo.filter("").await;
        assert_eq!(all, repo.records().await);
    }

    #[tokio::test]
    async fn filter_matches_name_and_description_case_insensitively() {
        let mut by_name = sample_record("r1");
        by_name.name = "Alice Consulting".to_string();
        let mut by_description = sample_record("r2");
        by_description.description = "freelance DESIGN work".to_string();
        let mut miss = sample_record("r3");
        miss.name = "Bob".to_string();
        miss.description = "plumbing".to_string();

        let ledger = FakeLedger::with_records(vec![by_name, by_description, miss]);
        let repo = RecordRepository::new();
        repo.refresh(&ledger).await.unwrap();

        let hits: Vec<String> = repo
            .filter("aLiCe")
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(hits, vec!["r1"]);

        let hits: Vec<String> = repo
            .filter("design")
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(hits, vec!["r2"]);
    }

    #[tokio::test]
    async fn aggregate_on_empty_repository_is_zeroed() {
        let repo = RecordRepository::new();
        assert_eq!(repo.aggregate().await, TaxStats::empty());
    }

    #[tokio::test]
    async fn aggregate_counts_unverified_income_as_zero() {
        // One unverified record with a deduction: income contributes nothing.
        let mut unverified = sample_record("r1");
        unverified.name = "R1".to_string();
        unverified.public_deduction = 1000;
        unverified.is_verified = false;
        unverified.decrypted_value = 0;

        let ledger = FakeLedger::with_records(vec![unverified]);
        let repo = RecordRepository::new();
        repo.refresh(&ledger).await.unwrap();

        let stats = repo.aggregate().await;
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.verified_records, 0);
        assert_eq!(stats.total_income, 0);
        assert_eq!(stats.avg_deduction, 1000.0);
    }

    #[tokio::test]
    async fn aggregate_mixes_verified_and_unverified() {
        let mut verified = sample_record("r1");
        verified.is_verified = true;
        verified.decrypted_value = 50_000;
        verified.public_deduction = 2000;
        let mut unverified = sample_record("r2");
        unverified.public_deduction = 1000;

        let ledger = FakeLedger::with_records(vec![verified, unverified]);
        let repo = RecordRepository::new();
        repo.refresh(&ledger).await.unwrap();

        let stats = repo.aggregate().await;
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.verified_records, 1);
        assert_eq!(stats.total_income, 50_000);
        assert_eq!(stats.avg_deduction, 1500.0);
    }
}
