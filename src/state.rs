// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::encryption::RelayerGateway;
use crate::ledger::TaxLedgerClient;
use crate::repository::RecordRepository;
use crate::session::WalletSession;
use crate::status::StatusChannel;
use crate::workflow::{CreationWorkflow, VerificationWorkflow};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<TaxLedgerClient>,
    pub encryption: Arc<RelayerGateway>,
    pub repository: Arc<RecordRepository>,
    pub session: Arc<WalletSession>,
    pub status: StatusChannel,
    pub create: Arc<CreationWorkflow<TaxLedgerClient, RelayerGateway>>,
    pub verify: Arc<VerificationWorkflow<TaxLedgerClient, RelayerGateway>>,
}

impl AppState {
    pub fn new(
        ledger: TaxLedgerClient,
        encryption: RelayerGateway,
        session: WalletSession,
    ) -> Self {
        let ledger = Arc::new(ledger);
        let encryption = Arc::new(encryption);
        let session = Arc::new(session);
        let repository = Arc::new(RecordRepository::new());
        let status = StatusChannel::new();

        let create = Arc::new(CreationWorkflow::new(
            Arc::clone(&ledger),
            Arc::clone(&encryption),
            Arc::clone(&repository),
            Arc::clone(&session),
            status.clone(),
        ));
        let verify = Arc::new(VerificationWorkflow::new(
            Arc::clone(&ledger),
            Arc::clone(&encryption),
            Arc::clone(&repository),
            Arc::clone(&session),
            status.clone(),
        ));

        Self {
            ledger,
            encryption,
            repository,
            session,
            status,
            create,
            verify,
        }
    }
}
