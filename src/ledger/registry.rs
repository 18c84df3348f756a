// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tax record registry contract interface.

use alloy::sol;

// Define the registry interface using alloy's sol! macro
sol! {
    #[sol(rpc)]
    interface ITaxRecordRegistry {
        struct RecordData {
            string name;
            string description;
            address creator;
            uint64 timestamp;
            uint64 publicDeduction;
            uint32 publicYear;
            bool isVerified;
            uint64 decryptedValue;
        }

        function getAllRecordIds() external view returns (string[] memory);
        function getRecord(string calldata recordId) external view returns (RecordData memory);
        function getEncryptedValue(string calldata recordId) external view returns (bytes32);
        function isAvailable() external view returns (bool);

        function createRecord(
            string calldata recordId,
            string calldata name,
            bytes32 encryptedIncome,
            bytes calldata inputProof,
            uint64 publicDeduction,
            uint32 publicYear,
            string calldata category
        ) external;

        function verifyDecryption(
            string calldata recordId,
            bytes calldata clearValues,
            bytes calldata decryptionProof
        ) external;
    }
}
