//! Handlers for the `/tasks` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fundbridge_core::task::ReviewDecision;
use fundbridge_core::types::DbId;
use fundbridge_db::models::task::CreateTask;
use fundbridge_engine::store::FundingStore;
use fundbridge_engine::tasks::ProgressUpdate;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireVolunteer};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// POST /api/v1/tasks
pub async fn create_task<S: FundingStore>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
    Json(body): Json<CreateTask>,
) -> AppResult<impl IntoResponse> {
    let task = state.engine.tasks.create_task(&auth.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task<S: FundingStore>(
    State(state): State<AppState<S>>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = state.engine.tasks.get_task(id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// GET /api/v1/tasks/{id}/updates
pub async fn list_task_updates<S: FundingStore>(
    State(state): State<AppState<S>>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let updates = state.engine.tasks.list_task_updates(id).await?;
    Ok(Json(DataResponse { data: updates }))
}

/// POST /api/v1/tasks/{id}/claim
pub async fn claim_task<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireVolunteer(volunteer): RequireVolunteer,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = state.engine.tasks.claim_task(id, volunteer.user_id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// POST /api/v1/tasks/{id}/progress
pub async fn update_progress<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireVolunteer(volunteer): RequireVolunteer,
    Path(id): Path<DbId>,
    Json(body): Json<ProgressUpdate>,
) -> AppResult<impl IntoResponse> {
    let task = state
        .engine
        .tasks
        .update_task_progress(id, volunteer.user_id, body)
        .await?;
    Ok(Json(DataResponse { data: task }))
}

/// POST /api/v1/tasks/{id}/review
pub async fn review_task<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(body): Json<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let task = state
        .engine
        .tasks
        .review_task(id, &admin.actor(), body.decision, body.feedback)
        .await?;
    Ok(Json(DataResponse { data: task }))
}

/// POST /api/v1/tasks/{id}/cancel
pub async fn cancel_task<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(body): Json<CancelRequest>,
) -> AppResult<impl IntoResponse> {
    let task = state
        .engine
        .tasks
        .cancel_task(id, &admin.actor(), &body.reason)
        .await?;
    Ok(Json(DataResponse { data: task }))
}
