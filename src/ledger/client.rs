// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Alloy-backed client for the tax record registry.

use std::str::FromStr;

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, Bytes, FixedBytes},
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, PendingTransactionBuilder, ProviderBuilder, RootProvider,
    },
};

use crate::config::{env_or_default, env_required, REGISTRY_ADDRESS_ENV, RPC_URL_ENV};
use crate::models::TaxRecord;
use crate::session::WalletSession;

use super::registry::ITaxRecordRegistry;
use super::types::NetworkConfig;
use super::{LedgerError, LedgerStore, NewRecord, PendingSubmission};

/// HTTP provider type for read-only registry calls (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Provider type for signed registry writes.
type SignerProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// Client for the tax record registry contract.
///
/// Reads go through a plain HTTP provider; writes require a connected
/// wallet session and go through a wallet-filled provider.
pub struct TaxLedgerClient {
    network: NetworkConfig,
    contract_address: String,
    reader: ITaxRecordRegistry::ITaxRecordRegistryInstance<HttpProvider>,
    writer: Option<ITaxRecordRegistry::ITaxRecordRegistryInstance<SignerProvider>>,
}

impl TaxLedgerClient {
    /// Create a new client for the given network and registry address.
    ///
    /// A write-capable contract instance is built only when the session
    /// carries a signer; otherwise the client is read-only.
    pub fn new(
        network: NetworkConfig,
        rpc_url: &str,
        contract_address: &str,
        session: &WalletSession,
    ) -> Result<Self, LedgerError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;

        let address = Address::from_str(contract_address)
            .map_err(|e| LedgerError::InvalidAddress(e.to_string()))?;

        let reader_provider = ProviderBuilder::new().connect_http(url.clone());
        let reader = ITaxRecordRegistry::new(address, reader_provider);

        let writer = session.wallet().map(|wallet| {
            let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);
            ITaxRecordRegistry::new(address, provider)
        });

        Ok(Self {
            network,
            contract_address: format!("{address:?}"),
            reader,
            writer,
        })
    }

    /// Create a client from the environment (`RPC_URL`, `TAX_REGISTRY_ADDRESS`).
    pub fn from_env(session: &WalletSession) -> Result<Self, LedgerError> {
        let network = super::FHEVM_SEPOLIA;
        let rpc_url = env_or_default(RPC_URL_ENV, network.rpc_url);
        let contract_address = env_required(REGISTRY_ADDRESS_ENV)
            .map_err(|name| LedgerError::InvalidAddress(format!("{name} is not set")))?;

        Self::new(network, &rpc_url, &contract_address, session)
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    fn writer(
        &self,
    ) -> Result<&ITaxRecordRegistry::ITaxRecordRegistryInstance<SignerProvider>, LedgerError> {
        self.writer.as_ref().ok_or(LedgerError::NoSigner)
    }
}

impl LedgerStore for TaxLedgerClient {
    type Pending = LedgerSubmission;

    async fn list_record_ids(&self) -> Result<Vec<String>, LedgerError> {
        self.reader
            .getAllRecordIds()
            .call()
            .await
            .map_err(|e| LedgerError::Contract(e.to_string()))
    }

    async fn record(&self, id: &str) -> Result<TaxRecord, LedgerError> {
        let data = self
            .reader
            .getRecord(id.to_string())
            .call()
            .await
            .map_err(|e| classify_read_error(id, e.to_string()))?;

        Ok(TaxRecord {
            id: id.to_string(),
            name: data.name,
            description: data.description,
            creator: format!("{:?}", data.creator),
            timestamp: data.timestamp,
            public_deduction: data.publicDeduction,
            public_year: data.publicYear,
            is_verified: data.isVerified,
            decrypted_value: data.decryptedValue,
        })
    }

    async fn encrypted_handle(&self, id: &str) -> Result<String, LedgerError> {
        let handle = self
            .reader
            .getEncryptedValue(id.to_string())
            .call()
            .await
            .map_err(|e| classify_read_error(id, e.to_string()))?;

        Ok(format!("{handle}"))
    }

    async fn create_record(&self, record: &NewRecord) -> Result<LedgerSubmission, LedgerError> {
        let writer = self.writer()?;
        let handle = parse_handle(&record.encrypted_income)?;
        let proof = parse_bytes(&record.input_proof)?;

        let pending = writer
            .createRecord(
                record.id.clone(),
                record.name.clone(),
                handle,
                proof,
                record.public_deduction,
                record.public_year,
                record.category.clone(),
            )
            .send()
            .await
            .map_err(|e| classify_write_error(e.to_string()))?;

        Ok(LedgerSubmission::new(pending, self.network.explorer_url))
    }

    async fn submit_verification(
        &self,
        id: &str,
        clear_values: &str,
        proof: &str,
    ) -> Result<LedgerSubmission, LedgerError> {
        let writer = self.writer()?;
        let clear = parse_bytes(clear_values)?;
        let proof = parse_bytes(proof)?;

        let pending = writer
            .verifyDecryption(id.to_string(), clear, proof)
            .send()
            .await
            .map_err(|e| classify_write_error(e.to_string()))?;

        Ok(LedgerSubmission::new(pending, self.network.explorer_url))
    }

    async fn is_available(&self) -> Result<bool, LedgerError> {
        self.reader
            .isAvailable()
            .call()
            .await
            .map_err(|e| LedgerError::Contract(e.to_string()))
    }

    fn contract_address(&self) -> &str {
        &self.contract_address
    }
}

/// A registry write accepted by the chain but not yet included in a block.
pub struct LedgerSubmission {
    tx_hash: String,
    explorer_url: String,
    pending: PendingTransactionBuilder<Ethereum>,
}

impl LedgerSubmission {
    fn new(pending: PendingTransactionBuilder<Ethereum>, explorer_base: &str) -> Self {
        let tx_hash = format!("{:?}", pending.tx_hash());
        let explorer_url = format!("{}/tx/{}", explorer_base, tx_hash);
        Self {
            tx_hash,
            explorer_url,
            pending,
        }
    }

    /// Transaction hash of the submission.
    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    /// Explorer URL for the submission.
    pub fn explorer_url(&self) -> &str {
        &self.explorer_url
    }
}

impl PendingSubmission for LedgerSubmission {
    async fn confirmed(self) -> Result<(), LedgerError> {
        let receipt = self
            .pending
            .get_receipt()
            .await
            .map_err(|e| classify_write_error(e.to_string()))?;

        if receipt.status() {
            Ok(())
        } else {
            Err(LedgerError::SubmissionFailed(format!(
                "transaction {} reverted",
                self.tx_hash
            )))
        }
    }
}

/// Parse a 0x-prefixed 32-byte encrypted handle.
fn parse_handle(raw: &str) -> Result<FixedBytes<32>, LedgerError> {
    FixedBytes::<32>::from_str(raw).map_err(|e| LedgerError::InvalidPayload(e.to_string()))
}

/// Parse 0x-prefixed proof/encoding bytes.
fn parse_bytes(raw: &str) -> Result<Bytes, LedgerError> {
    Bytes::from_str(raw).map_err(|e| LedgerError::InvalidPayload(e.to_string()))
}

/// Map a read failure to `NotFound` when the registry reverts with its
/// missing-record reason.
fn classify_read_error(record_id: &str, message: String) -> LedgerError {
    if message.to_lowercase().contains("not found") {
        LedgerError::NotFound(record_id.to_string())
    } else {
        LedgerError::Contract(message)
    }
}

/// Classify a write failure by its known rejection signals.
///
/// The wallet layer surfaces an explicit user rejection with a "user
/// rejected" reason; the registry reverts a lost verification race with an
/// "already verified" reason. Everything else is an opaque submission
/// failure.
fn classify_write_error(message: String) -> LedgerError {
    let lower = message.to_lowercase();
    if lower.contains("user rejected") || lower.contains("rejected by user") {
        LedgerError::Rejected
    } else if lower.contains("already verified") {
        LedgerError::AlreadyVerified
    } else {
        LedgerError::SubmissionFailed(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_write_error_detects_user_rejection() {
        let err = classify_write_error("error: user rejected transaction".to_string());
        assert!(matches!(err, LedgerError::Rejected));

        let err = classify_write_error("Transaction was rejected by user".to_string());
        assert!(matches!(err, LedgerError::Rejected));
    }

    #[test]
    fn classify_write_error_detects_verification_race() {
        let err =
            classify_write_error("execution reverted: Data already verified".to_string());
        assert!(matches!(err, LedgerError::AlreadyVerified));
    }

    #[test]
    fn classify_write_error_passes_through_other_failures() {
        let err = classify_write_error("nonce too low".to_string());
        assert!(matches!(err, LedgerError::SubmissionFailed(m) if m == "nonce too low"));
    }

    #[test]
    fn classify_read_error_detects_missing_record() {
        let err = classify_read_error("r1", "execution reverted: Record not found".to_string());
        assert!(matches!(err, LedgerError::NotFound(id) if id == "r1"));
    }

    #[test]
    fn parse_handle_rejects_bad_length() {
        assert!(parse_handle("0x1234").is_err());
        assert!(parse_handle(&format!("0x{}", "ab".repeat(32))).is_ok());
    }

    #[test]
    fn parse_bytes_accepts_prefixed_hex() {
        let bytes = parse_bytes("0xdeadbeef").unwrap();
        assert_eq!(bytes.len(), 4);
        assert!(parse_bytes("not-hex").is_err());
    }

    #[test]
    fn read_only_client_has_no_writer() {
        let session = WalletSession::disconnected();
        let client = TaxLedgerClient::new(
            super::super::FHEVM_SEPOLIA,
            "https://ethereum-sepolia-rpc.publicnode.com",
            "0x5425890298aed601595a70AB815c96711a31Bc65",
            &session,
        )
        .unwrap();

        assert!(client.writer().is_err());
        assert!(client.contract_address().starts_with("0x"));
    }

    #[test]
    fn invalid_registry_address_is_rejected() {
        let session = WalletSession::disconnected();
        let result = TaxLedgerClient::new(
            super::super::FHEVM_SEPOLIA,
            "https://ethereum-sepolia-rpc.publicnode.com",
            "not-an-address",
            &session,
        );
        assert!(matches!(result, Err(LedgerError::InvalidAddress(_))));
    }
}
