// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP gateway to the FHE relayer (encryption service).
//!
//! The relayer fronts the FHE coprocessor: it produces encrypted inputs
//! with attestations and orchestrates the threshold decryption protocol,
//! returning cleartext values plus a proof the registry can verify
//! on-chain.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::{env_or_default, RELAYER_URL_ENV};

use super::{EncryptedInput, EncryptionError, EncryptionService, RevealProof};

const DEFAULT_RELAYER_URL: &str = "https://relayer.testnet.zama.cloud";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the relayer API.
pub struct RelayerGateway {
    base_url: String,
    http: Client,
    initialized: OnceCell<()>,
}

#[derive(Debug, Deserialize)]
struct InputProofResponse {
    handles: Vec<String>,
    input_proof: String,
}

#[derive(Debug, Deserialize)]
struct PublicDecryptResponse {
    clear_values: HashMap<String, String>,
    abi_encoded_values: String,
    decryption_proof: String,
}

impl RelayerGateway {
    /// Create a gateway for the given relayer base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, EncryptionError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EncryptionError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            initialized: OnceCell::new(),
        })
    }

    /// Create a gateway from the environment (`RELAYER_URL`).
    pub fn from_env() -> Result<Self, EncryptionError> {
        Self::new(env_or_default(RELAYER_URL_ENV, DEFAULT_RELAYER_URL))
    }

    /// The relayer base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the session has completed initialization.
    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    async fn probe(&self) -> Result<(), EncryptionError> {
        let url = format!("{}/v1/keyurl", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| EncryptionError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| EncryptionError::Unavailable(e.to_string()))?;

        debug!(relayer = %self.base_url, "Relayer session initialized");
        Ok(())
    }
}

impl EncryptionService for RelayerGateway {
    async fn ensure_initialized(&self) -> Result<(), EncryptionError> {
        // A failed probe leaves the cell empty, so the next call retries.
        self.initialized
            .get_or_try_init(|| self.probe())
            .await
            .map(|_| ())
    }

    async fn encrypt(
        &self,
        contract: &str,
        submitter: &str,
        value: u64,
    ) -> Result<EncryptedInput, EncryptionError> {
        let url = format!("{}/v1/input-proof", self.base_url);
        let payload = json!({
            "contract_address": contract,
            "user_address": submitter,
            "values": [{ "type": "uint64", "value": value.to_string() }],
        });

        let response: InputProofResponse = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EncryptionError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| EncryptionError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| EncryptionError::InvalidResponse(e.to_string()))?;

        let handle = response
            .handles
            .into_iter()
            .next()
            .ok_or_else(|| EncryptionError::InvalidResponse("no handle returned".to_string()))?;

        Ok(EncryptedInput {
            handle,
            proof: response.input_proof,
        })
    }

    async fn acquire_reveal_proof(
        &self,
        contract: &str,
        handles: &[String],
    ) -> Result<RevealProof, EncryptionError> {
        let url = format!("{}/v1/public-decrypt", self.base_url);
        let payload = json!({
            "contract_address": contract,
            "handles": handles,
        });

        let response: PublicDecryptResponse = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EncryptionError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| EncryptionError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| EncryptionError::InvalidResponse(e.to_string()))?;

        Ok(RevealProof {
            clear_values: parse_clear_values(response.clear_values)?,
            encoded_values: response.abi_encoded_values,
            proof: response.decryption_proof,
        })
    }
}

/// Parse the relayer's stringly-typed cleartext values into integers.
fn parse_clear_values(
    raw: HashMap<String, String>,
) -> Result<HashMap<String, u64>, EncryptionError> {
    raw.into_iter()
        .map(|(handle, value)| {
            value
                .parse::<u64>()
                .map(|parsed| (handle, parsed))
                .map_err(|_| {
                    EncryptionError::InvalidResponse(format!(
                        "non-integer clear value `{value}`"
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let gateway = RelayerGateway::new("https://relayer.example/").unwrap();
        assert_eq!(gateway.base_url(), "https://relayer.example");
        assert!(!gateway.is_initialized());
    }

    #[test]
    fn parse_clear_values_accepts_integers() {
        let mut raw = HashMap::new();
        raw.insert("0xaa".to_string(), "50000".to_string());
        let parsed = parse_clear_values(raw).unwrap();
        assert_eq!(parsed.get("0xaa"), Some(&50000));
    }

    #[test]
    fn parse_clear_values_rejects_garbage() {
        let mut raw = HashMap::new();
        raw.insert("0xaa".to_string(), "fifty".to_string());
        assert!(matches!(
            parse_clear_values(raw),
            Err(EncryptionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn decrypt_response_deserializes() {
        let body = r#"{
            "clear_values": { "0xaa": "123" },
            "abi_encoded_values": "0x01",
            "decryption_proof": "0x02"
        }"#;
        let parsed: PublicDecryptResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.abi_encoded_values, "0x01");
        assert_eq!(parsed.decryption_proof, "0x02");
        assert_eq!(parsed.clear_values.len(), 1);
    }

    #[test]
    fn input_proof_response_deserializes() {
        let body = r#"{ "handles": ["0xaa"], "input_proof": "0x0b" }"#;
        let parsed: InputProofResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.handles, vec!["0xaa"]);
        assert_eq!(parsed.input_proof, "0x0b");
    }
}
