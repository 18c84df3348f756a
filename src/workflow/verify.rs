// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification workflow: encrypted → proved → revealed.
//!
//! The reveal is a two-phase commit. Phase one asks the encryption
//! service for the cleartext values and a verification proof (a pure
//! request/response; the service runs the off-band threshold protocol).
//! Phase two submits that proof to the ledger's verification entry point,
//! keyed by record id. A record that is already verified — up front or
//! because another party won the race — never re-enters the pipeline.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::encryption::EncryptionService;
use crate::ledger::{LedgerError, LedgerStore, PendingSubmission};
use crate::repository::RecordRepository;
use crate::session::WalletSession;
use crate::status::StatusChannel;

use super::{refresh_repository, WorkflowError};

/// Verification workflow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyPhase {
    Idle,
    Checking,
    RequestingProof,
    VerifyingOnChain,
    Revealed,
    AlreadyVerified,
    Error,
}

impl std::fmt::Display for VerifyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VerifyPhase::Idle => "idle",
            VerifyPhase::Checking => "checking",
            VerifyPhase::RequestingProof => "requesting_proof",
            VerifyPhase::VerifyingOnChain => "verifying_on_chain",
            VerifyPhase::Revealed => "revealed",
            VerifyPhase::AlreadyVerified => "already_verified",
            VerifyPhase::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// A successful reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// The ledger already holds the verified value; no new proof was run.
    AlreadyVerified { value: u64 },
    /// Freshly revealed. Authoritative only once the next refresh shows
    /// the record as verified; callers must present it as provisional
    /// until then.
    Provisional { value: u64 },
}

impl RevealOutcome {
    pub fn value(&self) -> u64 {
        match self {
            RevealOutcome::AlreadyVerified { value } => *value,
            RevealOutcome::Provisional { value } => *value,
        }
    }
}

/// Orchestrates the decrypt-and-prove protocol for one record at a time.
pub struct VerificationWorkflow<L, E> {
    ledger: Arc<L>,
    encryption: Arc<E>,
    repository: Arc<RecordRepository>,
    session: Arc<WalletSession>,
    status: StatusChannel,
    /// Records with a verification currently in flight. A second trigger
    /// for the same record is ignored, not restarted, so a record never
    /// has two concurrent on-chain submissions.
    in_flight: Mutex<HashSet<String>>,
}

impl<L: LedgerStore, E: EncryptionService> VerificationWorkflow<L, E> {
    pub fn new(
        ledger: Arc<L>,
        encryption: Arc<E>,
        repository: Arc<RecordRepository>,
        session: Arc<WalletSession>,
        status: StatusChannel,
    ) -> Self {
        Self {
            ledger,
            encryption,
            repository,
            session,
            status,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Reveal the income value for a record.
    ///
    /// Returns `None` on failure (after one error status) and when a
    /// verification for this record is already in flight.
    pub async fn decrypt(&self, record_id: &str) -> Option<RevealOutcome> {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if !in_flight.insert(record_id.to_string()) {
                debug!(record_id, "Verification already in flight, ignoring");
                return None;
            }
        }

        let result = self.run(record_id).await;

        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(record_id);
        }

        match result {
            Ok(outcome) => {
                match outcome {
                    RevealOutcome::AlreadyVerified { .. } => {
                        self.status.success("Data already verified on-chain")
                    }
                    RevealOutcome::Provisional { .. } => {
                        self.status.success("Income decrypted and verified!")
                    }
                }
                Some(outcome)
            }
            Err(e) => {
                warn!(record_id, error = %e, "Verification failed");
                match &e {
                    WorkflowError::NotConnected => self.status.error(e.to_string()),
                    _ => self.status.error(format!("Decryption failed: {e}")),
                }
                None
            }
        }
    }

    async fn run(&self, record_id: &str) -> Result<RevealOutcome, WorkflowError> {
        if !self.session.is_connected() {
            return Err(WorkflowError::NotConnected);
        }

        debug!(record_id, phase = %VerifyPhase::Checking, "Verification workflow transition");
        let record = self.ledger.record(record_id).await?;
        if record.is_verified {
            // At-most-once: a settled record never re-runs the pipeline.
            debug!(record_id, phase = %VerifyPhase::AlreadyVerified, "Verification workflow transition");
            return Ok(RevealOutcome::AlreadyVerified {
                value: record.decrypted_value,
            });
        }

        debug!(record_id, phase = %VerifyPhase::RequestingProof, "Verification workflow transition");
        self.status.pending("Requesting decryption proof...");
        self.encryption.ensure_initialized().await?;
        let handle = self.ledger.encrypted_handle(record_id).await?;
        let reveal = self
            .encryption
            .acquire_reveal_proof(
                self.ledger.contract_address(),
                std::slice::from_ref(&handle),
            )
            .await?;

        debug!(record_id, phase = %VerifyPhase::VerifyingOnChain, "Verification workflow transition");
        self.status.pending("Verifying decryption on-chain...");
        let submission = match self
            .ledger
            .submit_verification(record_id, &reveal.encoded_values, &reveal.proof)
            .await
        {
            Ok(pending) => pending.confirmed().await,
            Err(e) => Err(e),
        };

        if let Err(e) = submission {
            if matches!(e, LedgerError::AlreadyVerified) {
                // Another party verified concurrently; the desired end
                // state already holds.
                info!(record_id, "Verification race lost, record already verified");
                refresh_repository(&self.repository, self.ledger.as_ref(), &self.status).await;
                let value = reveal.clear_values.get(&handle).copied().unwrap_or(0);
                return Ok(RevealOutcome::AlreadyVerified { value });
            }
            return Err(e.into());
        }

        debug!(record_id, phase = %VerifyPhase::Revealed, "Verification workflow transition");
        let value = reveal
            .clear_values
            .get(&handle)
            .copied()
            .ok_or_else(|| {
                WorkflowError::Encryption("missing clear value for handle".to_string())
            })?;

        refresh_repository(&self.repository, self.ledger.as_ref(), &self.status).await;
        info!(record_id, value, "Income revealed and verified");
        Ok(RevealOutcome::Provisional { value })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::models::StatusKind;
    use crate::session::parse_signer;
    use crate::testing::{sample_record, FakeEncryption, FakeLedger};

    const TEST_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn workflow(
        ledger: FakeLedger,
        session: WalletSession,
    ) -> (
        Arc<VerificationWorkflow<FakeLedger, FakeEncryption>>,
        Arc<FakeLedger>,
        Arc<FakeEncryption>,
        Arc<RecordRepository>,
        StatusChannel,
    ) {
        let ledger = Arc::new(ledger);
        let encryption = Arc::new(FakeEncryption::default());
        let repository = Arc::new(RecordRepository::new());
        let status = StatusChannel::new();
        let flow = Arc::new(VerificationWorkflow::new(
            Arc::clone(&ledger),
            Arc::clone(&encryption),
            Arc::clone(&repository),
            Arc::new(session),
            status.clone(),
        ));
        (flow, ledger, encryption, repository, status)
    }

    fn connected() -> WalletSession {
        WalletSession::connected(parse_signer(TEST_KEY).unwrap())
    }

    #[tokio::test]
    async fn verified_record_short_circuits_without_new_proof() {
        let mut record = sample_record("r1");
        record.is_verified = true;
        record.decrypted_value = 77_000;
        let (flow, ledger, encryption, _repository, status) =
            workflow(FakeLedger::with_records(vec![record]), connected());

        let outcome = flow.decrypt("r1").await.expect("reveal succeeds");
        assert_eq!(outcome, RevealOutcome::AlreadyVerified { value: 77_000 });

        // The proof pipeline never ran.
        assert_eq!(encryption.reveal_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.verify_calls.load(Ordering::SeqCst), 0);

        let shown = status.snapshot();
        assert_eq!(shown.status, StatusKind::Success);
        assert_eq!(shown.message, "Data already verified on-chain");
    }

    #[tokio::test]
    async fn reveal_runs_proof_pipeline_and_refreshes() {
        let (flow, ledger, encryption, repository, status) =
            workflow(FakeLedger::with_records(vec![sample_record("r1")]), connected());
        encryption.clear_value.store(50_000, Ordering::SeqCst);

        let outcome = flow.decrypt("r1").await.expect("reveal succeeds");
        assert_eq!(outcome, RevealOutcome::Provisional { value: 50_000 });
        assert_eq!(outcome.value(), 50_000);

        assert_eq!(encryption.reveal_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.verify_calls.load(Ordering::SeqCst), 1);

        // The triggered refresh now shows the ledger-confirmed value.
        let record = repository.find("r1").await.expect("record projected");
        assert!(record.is_verified);
        assert_eq!(record.decrypted_value, 50_000);
        assert_eq!(status.snapshot().status, StatusKind::Success);
    }

    #[tokio::test]
    async fn lost_verification_race_is_success_not_error() {
        let (flow, ledger, encryption, repository, status) =
            workflow(FakeLedger::with_records(vec![sample_record("r1")]), connected());
        ledger.already_verified_on_submit.store(true, Ordering::SeqCst);
        encryption.clear_value.store(42_000, Ordering::SeqCst);

        let outcome = flow.decrypt("r1").await.expect("race is treated as success");
        assert_eq!(outcome, RevealOutcome::AlreadyVerified { value: 42_000 });

        let shown = status.snapshot();
        assert_eq!(shown.status, StatusKind::Success);

        // The repository was refreshed from the ledger.
        assert!(repository.find("r1").await.is_some());
    }

    #[tokio::test]
    async fn disconnected_session_fails_before_any_side_effect() {
        let (flow, ledger, encryption, _repository, status) =
            workflow(FakeLedger::with_records(vec![sample_record("r1")]), WalletSession::disconnected());

        assert!(flow.decrypt("r1").await.is_none());
        assert_eq!(encryption.reveal_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.verify_calls.load(Ordering::SeqCst), 0);
        assert_eq!(status.snapshot().message, "Please connect wallet first");
    }

    #[tokio::test]
    async fn missing_record_surfaces_one_error_status() {
        let (flow, _ledger, _encryption, _repository, status) =
            workflow(FakeLedger::default(), connected());

        assert!(flow.decrypt("ghost").await.is_none());
        let shown = status.snapshot();
        assert_eq!(shown.status, StatusKind::Error);
        assert!(shown.message.starts_with("Decryption failed:"));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_decrypt_for_same_record_is_ignored() {
        let ledger = FakeLedger::with_records(vec![sample_record("r1")]);
        ledger.set_record_delay(Duration::from_millis(100));
        let (flow, ledger, _encryption, _repository, _status) = workflow(ledger, connected());

        let first = {
            let flow = Arc::clone(&flow);
            tokio::spawn(async move { flow.decrypt("r1").await })
        };

        // Let the first verification reach its in-flight fetch.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(flow.decrypt("r1").await.is_none(), "second trigger ignored");

        assert!(first.await.unwrap().is_some());
        assert_eq!(ledger.verify_calls.load(Ordering::SeqCst), 1);
    }
}
