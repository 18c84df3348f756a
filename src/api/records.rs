// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record API endpoints.
//!
//! Handlers delegate to the repository and the workflows; workflow
//! outcomes are reported as sentinels alongside the current transaction
//! status slot, never as propagated errors.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    models::{TaxRecord, TaxStats, TransactionStatus},
    repository::RefreshOutcome,
    state::AppState,
    tax::estimate_tax,
    workflow::{CreateRecordRequest, RevealOutcome},
};

/// Query parameters for the record listing.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListRecordsParams {
    /// Case-insensitive substring filter over name and description.
    pub search: Option<String>,
}

/// Response containing the (optionally filtered) record snapshot.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordListResponse {
    /// Records in listing order.
    pub records: Vec<TaxRecord>,
    /// Number of records returned.
    pub total: usize,
    /// Whether a snapshot refresh is currently in flight.
    pub refreshing: bool,
}

/// Response after triggering a snapshot refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    /// False when another refresh was already in flight.
    pub refreshed: bool,
    /// Snapshot size after the refresh (unchanged when coalesced).
    pub total: usize,
    /// Records dropped because their individual fetch failed.
    pub dropped: usize,
}

/// Response after a creation attempt.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRecordResponse {
    /// Whether the record was created and confirmed.
    pub success: bool,
    /// Generated record id on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// Transaction status slot after the attempt.
    pub status: TransactionStatus,
}

/// Response after a decrypt attempt.
#[derive(Debug, Serialize, ToSchema)]
pub struct DecryptResponse {
    /// Whether a value was revealed.
    pub success: bool,
    /// The revealed income value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    /// True while the reveal is not yet ledger-confirmed; clients must
    /// present provisional values distinctly until a refresh shows the
    /// record as verified.
    pub provisional: bool,
    /// Transaction status slot after the attempt.
    pub status: TransactionStatus,
}

/// Record detail with derived presentation fields.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordDetailResponse {
    pub record: TaxRecord,
    /// Creation time as RFC 3339.
    pub created_at: String,
    /// Estimated tax over the verified income; absent while encrypted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_tax: Option<f64>,
}

/// List records, optionally filtered.
#[utoipa::path(
    get,
    path = "/v1/records",
    tag = "Records",
    params(("search" = Option<String>, Query, description = "Substring filter over name and description")),
    responses(
        (status = 200, description = "Current record snapshot", body = RecordListResponse)
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<ListRecordsParams>,
) -> Json<RecordListResponse> {
    let records = match params.search.as_deref() {
        Some(query) if !query.is_empty() => state.repository.filter(query).await,
        _ => state.repository.records().await,
    };

    Json(RecordListResponse {
        total: records.len(),
        refreshing: state.repository.is_refreshing(),
        records,
    })
}

/// Rebuild the record snapshot from the ledger.
#[utoipa::path(
    post,
    path = "/v1/records/refresh",
    tag = "Records",
    responses(
        (status = 200, description = "Refresh completed or coalesced", body = RefreshResponse),
        (status = 502, description = "Ledger listing failed")
    )
)]
pub async fn refresh_records(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, ApiError> {
    match state.repository.refresh(state.ledger.as_ref()).await {
        Ok(RefreshOutcome::Refreshed { total, dropped }) => Ok(Json(RefreshResponse {
            refreshed: true,
            total,
            dropped,
        })),
        Ok(RefreshOutcome::AlreadyInFlight) => Ok(Json(RefreshResponse {
            refreshed: false,
            total: state.repository.records().await.len(),
            dropped: 0,
        })),
        Err(e) => {
            state.status.error("Failed to load data");
            Err(ApiError::new(
                axum::http::StatusCode::BAD_GATEWAY,
                format!("Ledger listing failed: {e}"),
            ))
        }
    }
}

/// Aggregate statistics over the snapshot.
#[utoipa::path(
    get,
    path = "/v1/records/stats",
    tag = "Records",
    responses(
        (status = 200, description = "Aggregate statistics", body = TaxStats)
    )
)]
pub async fn record_stats(State(state): State<AppState>) -> Json<TaxStats> {
    Json(state.repository.aggregate().await)
}

/// Fetch one record with derived detail fields.
#[utoipa::path(
    get,
    path = "/v1/records/{record_id}",
    tag = "Records",
    params(("record_id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record detail", body = RecordDetailResponse),
        (status = 404, description = "Record not found")
    )
)]
pub async fn record_detail(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<RecordDetailResponse>, ApiError> {
    let record = state
        .repository
        .find(&record_id)
        .await
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    let created_at = chrono::DateTime::from_timestamp(record.timestamp as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    let estimated_tax = record
        .is_verified
        .then(|| estimate_tax(record.decrypted_value, record.public_deduction));

    Ok(Json(RecordDetailResponse {
        record,
        created_at,
        estimated_tax,
    }))
}

/// Create a new encrypted record.
#[utoipa::path(
    post,
    path = "/v1/records",
    tag = "Records",
    request_body = CreateRecordRequest,
    responses(
        (status = 200, description = "Creation attempted; see success flag and status", body = CreateRecordResponse),
        (status = 400, description = "Empty record name")
    )
)]
pub async fn create_record(
    State(state): State<AppState>,
    Json(request): Json<CreateRecordRequest>,
) -> Result<Json<CreateRecordResponse>, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("Record name must not be empty"));
    }

    let record_id = state.create.create(request).await;
    Ok(Json(CreateRecordResponse {
        success: record_id.is_some(),
        record_id,
        status: state.status.snapshot(),
    }))
}

/// Reveal the income value for a record through on-chain verification.
#[utoipa::path(
    post,
    path = "/v1/records/{record_id}/decrypt",
    tag = "Records",
    params(("record_id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Reveal attempted; see success flag and status", body = DecryptResponse)
    )
)]
pub async fn decrypt_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Json<DecryptResponse> {
    match state.verify.decrypt(&record_id).await {
        Some(outcome) => Json(DecryptResponse {
            success: true,
            value: Some(outcome.value()),
            provisional: matches!(outcome, RevealOutcome::Provisional { .. }),
            status: state.status.snapshot(),
        }),
        None => Json(DecryptResponse {
            success: false,
            value: None,
            provisional: false,
            status: state.status.snapshot(),
        }),
    }
}

/// Current transaction status slot.
#[utoipa::path(
    get,
    path = "/v1/status",
    tag = "Status",
    responses(
        (status = 200, description = "Current status slot", body = TransactionStatus)
    )
)]
pub async fn transaction_status(State(state): State<AppState>) -> Json<TransactionStatus> {
    Json(state.status.snapshot())
}
