// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory fakes of the external collaborators, shared by the
//! repository and workflow tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::encryption::{EncryptedInput, EncryptionError, EncryptionService, RevealProof};
use crate::ledger::{LedgerError, LedgerStore, NewRecord, PendingSubmission};
use crate::models::TaxRecord;

/// A minimal unverified record.
pub fn sample_record(id: &str) -> TaxRecord {
    TaxRecord {
        id: id.to_string(),
        name: format!("record {id}"),
        description: "Tax Record".to_string(),
        creator: "0x1111111111111111111111111111111111111111".to_string(),
        timestamp: 1_760_000_000,
        public_deduction: 500,
        public_year: 2024,
        is_verified: false,
        decrypted_value: 0,
    }
}

pub struct FakePending {
    result: Result<(), LedgerError>,
}

impl PendingSubmission for FakePending {
    async fn confirmed(self) -> Result<(), LedgerError> {
        self.result
    }
}

/// Scriptable in-memory ledger.
#[derive(Default)]
pub struct FakeLedger {
    records: Mutex<Vec<TaxRecord>>,
    failing_records: Mutex<HashSet<String>>,
    list_delay: Mutex<Option<Duration>>,
    record_delay: Mutex<Option<Duration>>,
    pub fail_listing: AtomicBool,
    pub reject_create: AtomicBool,
    pub already_verified_on_submit: AtomicBool,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
}

impl FakeLedger {
    pub fn with_records(records: Vec<TaxRecord>) -> Self {
        let ledger = Self::default();
        *ledger.records.lock().unwrap() = records;
        ledger
    }

    /// Make the per-record fetch for `id` fail.
    pub fn fail_record(&self, id: &str) {
        self.failing_records.lock().unwrap().insert(id.to_string());
    }

    /// Delay `list_record_ids` to hold a refresh in flight.
    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    /// Delay `record` to hold a verification in flight.
    pub fn set_record_delay(&self, delay: Duration) {
        *self.record_delay.lock().unwrap() = Some(delay);
    }

    pub fn get(&self, id: &str) -> Option<TaxRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Mark a record verified with the given value, as the registry would
    /// after a successful verification write.
    pub fn mark_verified(&self, id: &str, value: u64) {
        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .iter_mut()
            .find(|record| record.id == id)
        {
            record.is_verified = true;
            record.decrypted_value = value;
        }
    }
}

impl LedgerStore for FakeLedger {
    type Pending = FakePending;

    async fn list_record_ids(&self) -> Result<Vec<String>, LedgerError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("listing failed".to_string()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|record| record.id.clone())
            .collect())
    }

    async fn record(&self, id: &str) -> Result<TaxRecord, LedgerError> {
        let delay = *self.record_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_records.lock().unwrap().contains(id) {
            return Err(LedgerError::Contract(format!("fetch failed for {id}")));
        }
        self.get(id).ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    async fn encrypted_handle(&self, id: &str) -> Result<String, LedgerError> {
        if self.get(id).is_none() {
            return Err(LedgerError::NotFound(id.to_string()));
        }
        Ok(format!("0xhandle-{id}"))
    }

    async fn create_record(&self, record: &NewRecord) -> Result<FakePending, LedgerError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_create.load(Ordering::SeqCst) {
            return Err(LedgerError::Rejected);
        }
        self.records.lock().unwrap().push(TaxRecord {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.category.clone(),
            creator: "0x1111111111111111111111111111111111111111".to_string(),
            timestamp: 1_760_000_000,
            public_deduction: record.public_deduction,
            public_year: record.public_year,
            is_verified: false,
            decrypted_value: 0,
        });
        Ok(FakePending { result: Ok(()) })
    }

    async fn submit_verification(
        &self,
        id: &str,
        clear_values: &str,
        _proof: &str,
    ) -> Result<FakePending, LedgerError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.already_verified_on_submit.load(Ordering::SeqCst) {
            return Err(LedgerError::AlreadyVerified);
        }
        let value = clear_values.parse::<u64>().unwrap_or(0);
        self.mark_verified(id, value);
        Ok(FakePending { result: Ok(()) })
    }

    async fn is_available(&self) -> Result<bool, LedgerError> {
        Ok(true)
    }

    fn contract_address(&self) -> &str {
        "0x2222222222222222222222222222222222222222"
    }
}

/// Scriptable in-memory encryption service.
pub struct FakeEncryption {
    pub clear_value: AtomicU64,
    pub fail_init: AtomicBool,
    pub fail_encrypt: AtomicBool,
    pub encrypt_calls: AtomicUsize,
    pub reveal_calls: AtomicUsize,
}

impl Default for FakeEncryption {
    fn default() -> Self {
        Self {
            clear_value: AtomicU64::new(50_000),
            fail_init: AtomicBool::new(false),
            fail_encrypt: AtomicBool::new(false),
            encrypt_calls: AtomicUsize::new(0),
            reveal_calls: AtomicUsize::new(0),
        }
    }
}

impl EncryptionService for FakeEncryption {
    async fn ensure_initialized(&self) -> Result<(), EncryptionError> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(EncryptionError::Unavailable("relayer offline".to_string()));
        }
        Ok(())
    }

    async fn encrypt(
        &self,
        _contract: &str,
        _submitter: &str,
        value: u64,
    ) -> Result<EncryptedInput, EncryptionError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_encrypt.load(Ordering::SeqCst) {
            return Err(EncryptionError::Request("encryption failed".to_string()));
        }
        Ok(EncryptedInput {
            handle: format!("0x{value:064x}"),
            proof: "0xdeadbeef".to_string(),
        })
    }

    async fn acquire_reveal_proof(
        &self,
        _contract: &str,
        handles: &[String],
    ) -> Result<RevealProof, EncryptionError> {
        self.reveal_calls.fetch_add(1, Ordering::SeqCst);
        let value = self.clear_value.load(Ordering::SeqCst);
        Ok(RevealProof {
            clear_values: handles
                .iter()
                .map(|handle| (handle.clone(), value))
                .collect(),
            encoded_values: value.to_string(),
            proof: "0xproof".to_string(),
        })
    }
}
