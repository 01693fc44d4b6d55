use axum::routing::{get, post};
use axum::Router;
use fundbridge_engine::store::FundingStore;

use crate::handlers::donation;
use crate::state::AppState;

/// Routes mounted at `/donations`.
///
/// ```text
/// POST   /              -> record_donation
/// GET    /{id}          -> get_donation
/// POST   /{id}/refund   -> refund_donation (admin)
/// ```
pub fn router<S: FundingStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", post(donation::record_donation::<S>))
        .route("/{id}", get(donation::get_donation::<S>))
        .route("/{id}/refund", post(donation::refund_donation::<S>))
}
