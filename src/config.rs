// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RPC_URL` | JSON-RPC endpoint of the FHE-enabled EVM chain | Sepolia public RPC |
//! | `TAX_REGISTRY_ADDRESS` | Address of the tax record registry contract | Required |
//! | `RELAYER_URL` | Base URL of the FHE relayer (encryption service) | Zama testnet relayer |
//! | `WALLET_PRIVATE_KEY` | Hex private key of the submitting identity | Optional (read-only mode) |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;

/// Environment variable name for the ledger JSON-RPC endpoint.
pub const RPC_URL_ENV: &str = "RPC_URL";

/// Environment variable name for the tax record registry contract address.
///
/// All record reads and writes go through this contract. The service fails
/// to start without it.
pub const REGISTRY_ADDRESS_ENV: &str = "TAX_REGISTRY_ADDRESS";

/// Environment variable name for the FHE relayer base URL.
pub const RELAYER_URL_ENV: &str = "RELAYER_URL";

/// Environment variable name for the submitting identity's private key.
///
/// Hex-encoded, with or without a `0x` prefix. When absent the service runs
/// in read-only mode: records can be listed and inspected but create and
/// decrypt operations fail with a not-connected error.
pub const WALLET_KEY_ENV: &str = "WALLET_PRIVATE_KEY";

/// Read an environment variable, falling back to a default when unset or empty.
pub(crate) fn env_or_default(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Read a required environment variable, returning its name on failure.
pub(crate) fn env_required(name: &str) -> Result<String, String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_default_falls_back() {
        assert_eq!(
            env_or_default("RELATIONAL_TAX_VAULT_UNSET_VAR", "fallback"),
            "fallback"
        );
    }

    #[test]
    fn env_required_reports_missing_name() {
        let err = env_required("RELATIONAL_TAX_VAULT_UNSET_VAR").unwrap_err();
        assert_eq!(err, "RELATIONAL_TAX_VAULT_UNSET_VAR");
    }
}
