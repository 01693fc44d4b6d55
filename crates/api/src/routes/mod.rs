pub mod admin;
pub mod campaign;
pub mod donation;
pub mod health;
pub mod notification;
pub mod task;

use axum::routing::post;
use axum::Router;
use fundbridge_engine::store::FundingStore;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /campaigns                       create
/// /campaigns/{id}                  get, edit (admin), delete (admin)
///
/// /donations                       record
/// /donations/{id}                  get (donor of record or admin)
/// /donations/{id}/refund           refund (admin)
/// /payments/confirmations          gateway confirmation (system)
///
/// /tasks                           create (admin or campaign creator)
/// /tasks/{id}                      get
/// /tasks/{id}/updates              progress history
/// /tasks/{id}/claim                claim (volunteer)
/// /tasks/{id}/progress             report progress (volunteer)
/// /tasks/{id}/review               review (admin)
/// /tasks/{id}/cancel               cancel (admin)
///
/// /notifications                   list, read state, unread count
///
/// /admin/audit-logs                audit query (admin)
/// /admin/ledger/reconcile          reconciliation pass (admin)
/// ```
pub fn api_routes<S: FundingStore>() -> Router<AppState<S>> {
    Router::new()
        .nest("/campaigns", campaign::router())
        .nest("/donations", donation::router())
        .route(
            "/payments/confirmations",
            post(handlers::donation::confirm_payment::<S>),
        )
        .nest("/tasks", task::router())
        .nest("/notifications", notification::router())
        .nest("/admin", admin::router())
}
