// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet session holding the submitting identity.
//!
//! The session either carries a local signer (connected) or nothing
//! (read-only). Write workflows treat a disconnected session as a hard
//! precondition failure, never a silent no-op.

use std::env;

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    signers::local::PrivateKeySigner,
};

use crate::config::WALLET_KEY_ENV;
use crate::ledger::LedgerError;

/// The identity used for ledger writes.
#[derive(Debug, Clone, Default)]
pub struct WalletSession {
    signer: Option<PrivateKeySigner>,
}

impl WalletSession {
    /// Build the session from the environment.
    ///
    /// An unset or empty `WALLET_PRIVATE_KEY` yields a disconnected
    /// session; a malformed key is an error.
    pub fn from_env() -> Result<Self, LedgerError> {
        match env::var(WALLET_KEY_ENV) {
            Ok(hex) if !hex.trim().is_empty() => Ok(Self::connected(parse_signer(hex.trim())?)),
            _ => Ok(Self::disconnected()),
        }
    }

    /// A session with a signing identity.
    pub fn connected(signer: PrivateKeySigner) -> Self {
        Self {
            signer: Some(signer),
        }
    }

    /// A session with no identity (read-only mode).
    pub fn disconnected() -> Self {
        Self { signer: None }
    }

    /// Whether a signing identity is present.
    pub fn is_connected(&self) -> bool {
        self.signer.is_some()
    }

    /// Address of the signing identity, if connected.
    pub fn address(&self) -> Option<Address> {
        self.signer.as_ref().map(|signer| signer.address())
    }

    /// An Ethereum wallet for transaction signing, if connected.
    pub fn wallet(&self) -> Option<EthereumWallet> {
        self.signer
            .as_ref()
            .map(|signer| EthereumWallet::from(signer.clone()))
    }
}

/// Create a signer from a hex private key (with or without 0x prefix).
pub fn parse_signer(private_key_hex: &str) -> Result<PrivateKeySigner, LedgerError> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim_start_matches("0x"))
        .map_err(|e| LedgerError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| LedgerError::InvalidPrivateKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Throwaway development key, never funded.
    const TEST_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn parse_signer_accepts_plain_and_prefixed_hex() {
        let plain = parse_signer(TEST_KEY).unwrap();
        let prefixed = parse_signer(&format!("0x{TEST_KEY}")).unwrap();
        assert_eq!(plain.address(), prefixed.address());
    }

    #[test]
    fn parse_signer_rejects_garbage() {
        assert!(matches!(
            parse_signer("zz-not-hex"),
            Err(LedgerError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn connected_session_exposes_identity() {
        let session = WalletSession::connected(parse_signer(TEST_KEY).unwrap());
        assert!(session.is_connected());
        assert!(session.address().is_some());
        assert!(session.wallet().is_some());
    }

    #[test]
    fn disconnected_session_has_no_identity() {
        let session = WalletSession::disconnected();
        assert!(!session.is_connected());
        assert!(session.address().is_none());
        assert!(session.wallet().is_none());
    }
}
