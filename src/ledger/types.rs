// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger network types and constants.

/// EVM network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Default RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Sepolia testnet with the Zama FHE coprocessor, where the tax record
/// registry is deployed.
pub const FHEVM_SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Sepolia (FHE coprocessor)",
    chain_id: 11155111,
    rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
    explorer_url: "https://sepolia.etherscan.io",
};

/// Category label submitted with every record creation.
///
/// The registry stores the category alongside the public fields; the
/// service only ever writes tax records.
pub const RECORD_CATEGORY: &str = "Tax Record";
