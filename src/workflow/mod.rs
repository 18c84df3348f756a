// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record lifecycle workflows.
//!
//! The creation workflow takes a plaintext income through encryption to a
//! confirmed ledger record; the verification workflow takes an existing
//! record through the decrypt-and-prove protocol to an on-chain verified
//! reveal. All failures are caught at the workflow boundary: each produces
//! exactly one transaction status event and a sentinel (`None`) for the
//! caller, never a propagated error.

use tracing::warn;

use crate::encryption::EncryptionError;
use crate::ledger::{LedgerError, LedgerStore};
use crate::repository::RecordRepository;
use crate::status::StatusChannel;

pub mod create;
pub mod verify;

pub use create::{CreateRecordRequest, CreationWorkflow};
pub use verify::{RevealOutcome, VerificationWorkflow};

/// Failure kinds surfaced by the workflows.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Please connect wallet first")]
    NotConnected,

    #[error("Encryption service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Transaction rejected by user")]
    SubmissionRejected,

    #[error("{0}")]
    Encryption(String),

    #[error("{0}")]
    Ledger(String),
}

impl From<EncryptionError> for WorkflowError {
    fn from(e: EncryptionError) -> Self {
        match e {
            EncryptionError::Unavailable(m) | EncryptionError::MissingConfig(m) => {
                Self::ServiceUnavailable(m)
            }
            other => Self::Encryption(other.to_string()),
        }
    }
}

impl From<LedgerError> for WorkflowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Rejected => Self::SubmissionRejected,
            LedgerError::NoSigner => Self::NotConnected,
            other => Self::Ledger(other.to_string()),
        }
    }
}

/// Refresh the repository after a completed ledger write.
///
/// A refresh failure here is reported on the status channel but does not
/// fail the workflow that triggered it; the write itself already succeeded.
pub(crate) async fn refresh_repository<L: LedgerStore>(
    repository: &RecordRepository,
    ledger: &L,
    status: &StatusChannel,
) {
    if let Err(e) = repository.refresh(ledger).await {
        warn!(error = %e, "Post-transaction refresh failed");
        status.error("Failed to load data");
    }
}
