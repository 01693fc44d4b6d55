use axum::routing::{get, post};
use axum::Router;
use fundbridge_engine::store::FundingStore;

use crate::handlers::admin;
use crate::state::AppState;

/// Admin routes mounted at `/admin`. The role is enforced by the handlers'
/// extractors.
pub fn router<S: FundingStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/audit-logs", get(admin::query_audit_logs::<S>))
        .route("/ledger/reconcile", post(admin::reconcile_ledger::<S>))
}
