// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{TaxRecord, TaxStats, TransactionStatus},
    state::AppState,
    workflow::CreateRecordRequest,
};

pub mod health;
pub mod records;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/records",
            get(records::list_records).post(records::create_record),
        )
        .route("/records/refresh", post(records::refresh_records))
        .route("/records/stats", get(records::record_stats))
        .route("/records/{record_id}", get(records::record_detail))
        .route(
            "/records/{record_id}/decrypt",
            post(records::decrypt_record),
        )
        .route("/status", get(records::transaction_status));

    Router::new()
        .nest("/v1", v1_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        records::list_records,
        records::create_record,
        records::refresh_records,
        records::record_stats,
        records::record_detail,
        records::decrypt_record,
        records::transaction_status,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            TaxRecord,
            TaxStats,
            TransactionStatus,
            CreateRecordRequest,
            records::RecordListResponse,
            records::RefreshResponse,
            records::CreateRecordResponse,
            records::DecryptResponse,
            records::RecordDetailResponse,
            health::ReadyResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Records", description = "Encrypted tax record lifecycle"),
        (name = "Status", description = "Transaction status channel"),
        (name = "Health", description = "Service health probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::RelayerGateway;
    use crate::ledger::{TaxLedgerClient, FHEVM_SEPOLIA};
    use crate::session::WalletSession;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let session = WalletSession::disconnected();
        let ledger = TaxLedgerClient::new(
            FHEVM_SEPOLIA,
            "https://ethereum-sepolia-rpc.publicnode.com",
            "0x5425890298aed601595a70AB815c96711a31Bc65",
            &session,
        )
        .unwrap();
        let encryption = RelayerGateway::new("https://relayer.example").unwrap();

        let app = router(AppState::new(ledger, encryption, session));
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
