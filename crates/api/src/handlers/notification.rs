//! Handlers for the `/notifications` resource. Every endpoint acts on the
//! authenticated recipient's own notifications.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fundbridge_core::types::DbId;
use fundbridge_engine::inbox::InboxQuery;
use fundbridge_engine::store::FundingStore;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/notifications
pub async fn list_notifications<S: FundingStore>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
    Query(params): Query<InboxQuery>,
) -> AppResult<impl IntoResponse> {
    let notifications = state.engine.inbox.list(auth.user_id, &params).await?;
    Ok(Json(DataResponse { data: notifications }))
}

/// POST /api/v1/notifications/{id}/read
///
/// 204 on success, 404 if the notification is not the caller's.
pub async fn mark_read<S: FundingStore>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.engine.inbox.mark_read(id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read<S: FundingStore>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse> {
    let count = state.engine.inbox.mark_all_read(auth.user_id).await?;
    Ok(Json(DataResponse {
        data: serde_json::json!({ "marked_read": count }),
    }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count<S: FundingStore>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse> {
    let count = state.engine.inbox.unread_count(auth.user_id).await?;
    Ok(Json(DataResponse {
        data: serde_json::json!({ "count": count }),
    }))
}
