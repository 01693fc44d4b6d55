use axum::routing::{get, post};
use axum::Router;
use fundbridge_engine::store::FundingStore;

use crate::handlers::campaign;
use crate::state::AppState;

/// Routes mounted at `/campaigns`.
///
/// ```text
/// POST   /          -> create_campaign
/// GET    /{id}      -> get_campaign
/// PATCH  /{id}      -> edit_campaign (admin)
/// DELETE /{id}      -> delete_campaign (admin)
/// ```
pub fn router<S: FundingStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", post(campaign::create_campaign::<S>))
        .route(
            "/{id}",
            get(campaign::get_campaign::<S>)
                .patch(campaign::edit_campaign::<S>)
                .delete(campaign::delete_campaign::<S>),
        )
}
