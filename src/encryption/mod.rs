// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encryption Service integration.
//!
//! The encryption service encrypts income values for submission and runs
//! the off-band decrypt-and-prove protocol. It is an opaque collaborator;
//! this module defines the [`EncryptionService`] contract plus the
//! HTTP-backed [`RelayerGateway`] that implements it.

use std::collections::HashMap;
use std::future::Future;

pub mod relayer;

pub use relayer::RelayerGateway;

/// Errors surfaced by the encryption service.
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("Encryption service configuration missing: {0}")]
    MissingConfig(String),

    #[error("Encryption service unavailable: {0}")]
    Unavailable(String),

    #[error("Encryption request failed: {0}")]
    Request(String),

    #[error("Encryption service response was invalid: {0}")]
    InvalidResponse(String),
}

/// An encrypted income value ready for ledger submission.
#[derive(Debug, Clone)]
pub struct EncryptedInput {
    /// 0x-prefixed 32-byte handle referencing the encrypted value.
    pub handle: String,
    /// 0x-prefixed input attestation bytes.
    pub proof: String,
}

/// Result of the off-band decrypt-and-prove protocol (phase one of the
/// verification commit).
///
/// Phase two, submitting `encoded_values` and `proof` to the ledger's
/// verification entry point, is a separate ledger write keyed by record id.
#[derive(Debug, Clone)]
pub struct RevealProof {
    /// Cleartext values keyed by encrypted handle.
    pub clear_values: HashMap<String, u64>,
    /// ABI-encoded cleartext values for the on-chain verification call.
    pub encoded_values: String,
    /// Decryption proof for the on-chain verification call.
    pub proof: String,
}

/// Operations the core requires from the encryption collaborator.
pub trait EncryptionService: Send + Sync {
    /// Initialize the service session. Idempotent; must succeed before
    /// encrypt or reveal use.
    fn ensure_initialized(&self) -> impl Future<Output = Result<(), EncryptionError>> + Send;

    /// Encrypt a plaintext income value for the given registry contract
    /// and submitter identity.
    fn encrypt(
        &self,
        contract: &str,
        submitter: &str,
        value: u64,
    ) -> impl Future<Output = Result<EncryptedInput, EncryptionError>> + Send;

    /// Run the off-band decryption protocol for the given handles and
    /// return the cleartext values plus the verification proof.
    fn acquire_reveal_proof(
        &self,
        contract: &str,
        handles: &[String],
    ) -> impl Future<Output = Result<RevealProof, EncryptionError>> + Send;
}
