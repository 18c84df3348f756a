// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Creation workflow: plaintext income → encrypted → submitted → confirmed.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::encryption::EncryptionService;
use crate::ledger::{LedgerStore, NewRecord, PendingSubmission, RECORD_CATEGORY};
use crate::repository::RecordRepository;
use crate::session::WalletSession;
use crate::status::StatusChannel;

use super::{refresh_repository, WorkflowError};

/// Tax year used when the submitted year does not parse.
pub const DEFAULT_TAX_YEAR: u32 = 2024;

/// Raw creation inputs as submitted by the caller.
///
/// Numeric fields arrive as strings and are coerced, never rejected:
/// anything that fails to parse as a non-negative integer becomes 0 (or
/// the default tax year).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRecordRequest {
    /// Display name for the record. Must be non-empty.
    pub name: String,
    /// Income amount; encrypted before it leaves the workflow.
    pub income: String,
    /// Deduction amount, stored in plaintext.
    pub deduction: String,
    /// Tax year, stored in plaintext.
    pub year: String,
}

/// Creation workflow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePhase {
    Idle,
    Encrypting,
    Submitting,
    Confirming,
    Done,
    Error,
}

impl std::fmt::Display for CreatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CreatePhase::Idle => "idle",
            CreatePhase::Encrypting => "encrypting",
            CreatePhase::Submitting => "submitting",
            CreatePhase::Confirming => "confirming",
            CreatePhase::Done => "done",
            CreatePhase::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Orchestrates the creation of a new encrypted record.
pub struct CreationWorkflow<L, E> {
    ledger: Arc<L>,
    encryption: Arc<E>,
    repository: Arc<RecordRepository>,
    session: Arc<WalletSession>,
    status: StatusChannel,
    phase: Mutex<CreatePhase>,
}

impl<L: LedgerStore, E: EncryptionService> CreationWorkflow<L, E> {
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
            phase: Mutex::new(CreatePhase::Idle),
        }
    }

    /// Current workflow phase.
    pub fn phase(&self) -> CreatePhase {
        self.phase.lock().map(|phase| *phase).unwrap_or(CreatePhase::Idle)
    }

    /// Create a new record end-to-end.
    ///
    /// Returns the generated record id, or `None` on failure after
    /// reporting exactly one error status. A failed attempt leaves no
    /// partial record behind and is safely retryable: a fresh id is
    /// generated on every attempt, so retries never collide with a prior
    /// one.
    pub async fn create(&self, request: CreateRecordRequest) -> Option<String> {
        match self.run(request).await {
            Ok(record_id) => Some(record_id),
            Err(e) => {
                // A missing identity never leaves idle; everything else is a
                // transition into the error state.
                if !matches!(e, WorkflowError::NotConnected) {
                    self.set_phase(CreatePhase::Error);
                }
                warn!(error = %e, "Record creation failed");
                match &e {
                    WorkflowError::Ledger(m) => {
                        self.status.error(format!("Submission failed: {m}"))
                    }
                    _ => self.status.error(e.to_string()),
                }
                None
            }
        }
    }

    async fn run(&self, request: CreateRecordRequest) -> Result<String, WorkflowError> {
        let submitter = self.session.address().ok_or(WorkflowError::NotConnected)?;

        self.set_phase(CreatePhase::Encrypting);
        self.status.pending("Encrypting income for submission...");
        self.encryption.ensure_initialized().await?;

        let income = coerce_amount(&request.income);
        let encrypted = self
            .encryption
            .encrypt(
                self.ledger.contract_address(),
                &submitter.to_string(),
                income,
            )
            .await?;

        self.set_phase(CreatePhase::Submitting);
        self.status.pending("Submitting record to the ledger...");
        let record = NewRecord {
            id: fresh_record_id(),
            name: request.name.trim().to_string(),
            encrypted_income: encrypted.handle,
            input_proof: encrypted.proof,
            public_deduction: coerce_amount(&request.deduction),
            public_year: coerce_year(&request.year),
            category: RECORD_CATEGORY.to_string(),
        };
        let pending = self.ledger.create_record(&record).await?;

        self.set_phase(CreatePhase::Confirming);
        self.status.pending("Waiting for ledger confirmation...");
        pending.confirmed().await?;

        self.set_phase(CreatePhase::Done);
        self.status.success("Tax record created successfully!");
        refresh_repository(&self.repository, self.ledger.as_ref(), &self.status).await;

        info!(record_id = %record.id, "Tax record created");
        Ok(record.id)
    }

    fn set_phase(&self, phase: CreatePhase) {
        debug!(phase = %phase, "Creation workflow transition");
        if let Ok(mut current) = self.phase.lock() {
            *current = phase;
        }
    }
}

/// Generate a fresh, collision-resistant record id.
fn fresh_record_id() -> String {
    format!("tax-record-{}", Uuid::new_v4())
}

/// Coerce a raw amount to a non-negative integer. Invalid input is 0.
fn coerce_amount(raw: &str) -> u64 {
    raw.trim().parse::<u64>().unwrap_or(0)
}

/// Coerce a raw year to a positive integer, defaulting the tax year.
fn coerce_year(raw: &str) -> u32 {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|year| *year > 0)
        .unwrap_or(DEFAULT_TAX_YEAR)
}
