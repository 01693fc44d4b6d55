//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;
use fundbridge_engine::store::FundingStore;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                 -> list_notifications
/// POST   /read-all         -> mark_all_read
/// GET    /unread-count     -> unread_count
/// POST   /{id}/read        -> mark_read
/// ```
pub fn router<S: FundingStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(notification::list_notifications::<S>))
        .route("/read-all", post(notification::mark_all_read::<S>))
        .route("/unread-count", get(notification::unread_count::<S>))
        .route("/{id}/read", post(notification::mark_read::<S>))
}
