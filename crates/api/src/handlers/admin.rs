//! Administrator back-office: audit trail queries and ledger reconciliation.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use fundbridge_db::models::audit::AuditQuery;
use fundbridge_engine::ledger::MAX_RECONCILE_BATCH;
use fundbridge_engine::store::FundingStore;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReconcileParams {
    /// Donations to apply in this pass (default and cap: the batch maximum).
    pub limit: Option<i64>,
}

/// GET /api/v1/admin/audit-logs
pub async fn query_audit_logs<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Query(params): Query<AuditQuery>,
) -> AppResult<impl IntoResponse> {
    let page = state.engine.emitter.query(&admin.actor(), &params).await?;
    Ok(Json(DataResponse { data: page }))
}

/// POST /api/v1/admin/ledger/reconcile
pub async fn reconcile_ledger<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Query(params): Query<ReconcileParams>,
) -> AppResult<impl IntoResponse> {
    let report = state
        .engine
        .ledger
        .reconcile(
            Some(&admin.actor()),
            params.limit.unwrap_or(MAX_RECONCILE_BATCH),
        )
        .await?;
    Ok(Json(DataResponse { data: report }))
}
