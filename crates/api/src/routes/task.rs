use axum::routing::{get, post};
use axum::Router;
use fundbridge_engine::store::FundingStore;

use crate::handlers::task;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// POST   /                 -> create_task
/// GET    /{id}             -> get_task
/// GET    /{id}/updates     -> list_task_updates
/// POST   /{id}/claim       -> claim_task (volunteer)
/// POST   /{id}/progress    -> update_progress (volunteer)
/// POST   /{id}/review      -> review_task (admin)
/// POST   /{id}/cancel      -> cancel_task (admin)
/// ```
pub fn router<S: FundingStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", post(task::create_task::<S>))
        .route("/{id}", get(task::get_task::<S>))
        .route("/{id}/updates", get(task::list_task_updates::<S>))
        .route("/{id}/claim", post(task::claim_task::<S>))
        .route("/{id}/progress", post(task::update_progress::<S>))
        .route("/{id}/review", post(task::review_task::<S>))
        .route("/{id}/cancel", post(task::cancel_task::<S>))
}
