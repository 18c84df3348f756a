// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relational_tax_vault::api::router;
use relational_tax_vault::encryption::{EncryptionService, RelayerGateway};
use relational_tax_vault::ledger::TaxLedgerClient;
use relational_tax_vault::poller::RefreshPoller;
use relational_tax_vault::session::WalletSession;
use relational_tax_vault::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let session = WalletSession::from_env().expect("Invalid WALLET_PRIVATE_KEY");
    match session.address() {
        Some(address) => info!(%address, "Wallet session connected"),
        None => info!("No wallet key configured, running read-only"),
    }

    let ledger = TaxLedgerClient::from_env(&session).expect("Invalid ledger configuration");
    let encryption = RelayerGateway::from_env().expect("Invalid relayer configuration");

    let state = AppState::new(ledger, encryption, session);

    // Initialize the relayer session up front. Failure is non-fatal: the
    // gateway retries on first encrypt/reveal use.
    if let Err(e) = state.encryption.ensure_initialized().await {
        warn!(error = %e, "Encryption service initialization failed");
        state.status.error("Encryption service initialization failed");
    }

    // Warm the record snapshot before serving.
    if let Err(e) = state.repository.refresh(state.ledger.as_ref()).await {
        warn!(error = %e, "Initial snapshot refresh failed");
    }

    let shutdown = CancellationToken::new();
    let poller = RefreshPoller::new(
        Arc::clone(&state.ledger),
        Arc::clone(&state.repository),
    );
    let poller_handle = tokio::spawn(poller.run(shutdown.clone()));

    let app = router(state);

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");

    info!("Relational Tax Vault listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("HTTP server failed");

    shutdown.cancel();
    let _ = poller_handle.await;
}

/// Resolve once ctrl-c arrives, cancelling background tasks first.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    info!("Shutdown signal received");
    shutdown.cancel();
}

/// Initialize tracing from `RUST_LOG` and `LOG_FORMAT`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
