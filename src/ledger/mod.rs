// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger Store integration.
//!
//! The ledger is an append-only, key-indexed registry contract on an
//! FHE-enabled EVM chain. This module defines the [`LedgerStore`] contract
//! consumed by the repository and the workflows, and the alloy-backed
//! [`TaxLedgerClient`] that implements it.

use std::future::Future;

use crate::models::TaxRecord;

pub mod client;
pub mod registry;
pub mod types;

pub use client::{LedgerSubmission, TaxLedgerClient};
pub use types::{NetworkConfig, FHEVM_SEPOLIA, RECORD_CATEGORY};

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Transaction rejected by user")]
    Rejected,

    #[error("Record already verified")]
    AlreadyVerified,

    #[error("No signing identity configured")]
    NoSigner,

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
}

/// Fields submitted to the ledger's create entry point.
///
/// The income itself travels only as the encrypted handle plus the input
/// attestation produced by the encryption service.
#[derive(Debug, Clone)]
pub struct NewRecord {
    /// Caller-generated unique id.
    pub id: String,
    /// Display name, plaintext.
    pub name: String,
    /// 0x-prefixed 32-byte encrypted income handle.
    pub encrypted_income: String,
    /// 0x-prefixed input attestation bytes.
    pub input_proof: String,
    /// Deduction amount, plaintext.
    pub public_deduction: u64,
    /// Tax year, plaintext.
    pub public_year: u32,
    /// Record category label.
    pub category: String,
}

/// A write accepted by the ledger but not yet durably recorded.
pub trait PendingSubmission: Send {
    /// Await durable inclusion. Resolves once the ledger confirms the
    /// submission, or fails if it is dropped or reverted.
    fn confirmed(self) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// Read and write operations against the record registry.
///
/// Implemented by [`TaxLedgerClient`] in production and by in-memory fakes
/// in tests. Write operations require a connected signing identity.
pub trait LedgerStore: Send + Sync {
    type Pending: PendingSubmission;

    /// Enumerate all record ids known to the registry.
    fn list_record_ids(&self) -> impl Future<Output = Result<Vec<String>, LedgerError>> + Send;

    /// Fetch the full public data for one record.
    fn record(&self, id: &str) -> impl Future<Output = Result<TaxRecord, LedgerError>> + Send;

    /// Fetch the encrypted-income handle for one record.
    fn encrypted_handle(&self, id: &str)
        -> impl Future<Output = Result<String, LedgerError>> + Send;

    /// Submit a new record.
    fn create_record(
        &self,
        record: &NewRecord,
    ) -> impl Future<Output = Result<Self::Pending, LedgerError>> + Send;

    /// Submit a decryption verification for one record.
    ///
    /// Fails with [`LedgerError::AlreadyVerified`] when another party won
    /// the verification race for this id.
    fn submit_verification(
        &self,
        id: &str,
        clear_values: &str,
        proof: &str,
    ) -> impl Future<Output = Result<Self::Pending, LedgerError>> + Send;

    /// Whether the registry reports itself available.
    fn is_available(&self) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    /// The registry contract address.
    fn contract_address(&self) -> &str;
}
