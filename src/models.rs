// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Core Data Models
//!
//! This module defines the record projection, aggregate statistics, and
//! transaction status types shared by the repository, the workflows, and the
//! REST API. All types derive `Serialize`, `Deserialize`, and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! ## Trust Model
//!
//! A [`TaxRecord`]'s `decrypted_value` is authoritative only while
//! `is_verified` is true. Unverified records carry a zero value; a value
//! revealed by the verification workflow before the next refresh confirms
//! `is_verified` is *provisional* and reported as such.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A tax record as projected from the ledger.
///
/// Public fields are stored on-chain in plaintext; the income value itself
/// is only ever referenced through an encrypted handle and never appears
/// here until verified.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TaxRecord {
    /// Unique identifier, assigned at creation and immutable.
    pub id: String,
    /// Short display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Address of the submitting identity, set once at creation.
    pub creator: String,
    /// Creation time in seconds since epoch, assigned by the ledger.
    pub timestamp: u64,
    /// Deduction amount, public plaintext.
    pub public_deduction: u64,
    /// Tax year, public plaintext.
    pub public_year: u32,
    /// True once the decryption has been verified on-chain. Monotonic.
    pub is_verified: bool,
    /// Verified income value. Zero until `is_verified` is true.
    pub decrypted_value: u64,
}

/// Aggregate statistics over the current record snapshot.
///
/// `total_income` sums `decrypted_value` over **all** records; unverified
/// records contribute zero until proved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TaxStats {
    /// Number of records in the snapshot.
    pub total_records: usize,
    /// Number of records with a verified decryption.
    pub verified_records: usize,
    /// Sum of verified income values.
    pub total_income: u64,
    /// Mean public deduction across all records (0 when empty).
    pub avg_deduction: f64,
}

impl TaxStats {
    /// Stats over an empty snapshot.
    pub fn empty() -> Self {
        Self {
            total_records: 0,
            verified_records: 0,
            total_income: 0,
            avg_deduction: 0.0,
        }
    }
}

/// Kind of a transaction status event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Pending,
    Success,
    Error,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusKind::Pending => write!(f, "pending"),
            StatusKind::Success => write!(f, "success"),
            StatusKind::Error => write!(f, "error"),
        }
    }
}

/// The process-wide, single-slot transaction status.
///
/// Only one status is observable at a time; a newer event overwrites the
/// slot (last-write-wins, no queue).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TransactionStatus {
    /// Whether the slot currently holds a visible status.
    pub visible: bool,
    /// Outcome kind of the most recent event.
    pub status: StatusKind,
    /// Human-readable message.
    pub message: String,
}

impl TransactionStatus {
    /// The hidden, initial slot value.
    pub fn hidden() -> Self {
        Self {
            visible: false,
            status: StatusKind::Pending,
            message: String::new(),
        }
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        Self::hidden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_kind_serializes_lowercase() {
        let json = serde_json::to_string(&StatusKind::Success).unwrap();
        assert_eq!(json, r#""success""#);
    }

    #[test]
    fn hidden_status_is_invisible() {
        let status = TransactionStatus::hidden();
        assert!(!status.visible);
        assert_eq!(status.status, StatusKind::Pending);
        assert!(status.message.is_empty());
    }

    #[test]
    fn empty_stats_are_zeroed() {
        let stats = TaxStats::empty();
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.verified_records, 0);
        assert_eq!(stats.total_income, 0);
        assert_eq!(stats.avg_deduction, 0.0);
    }
}
