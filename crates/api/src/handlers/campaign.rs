//! Handlers for the `/campaigns` resource.
//!
//! Amounts cross the wire as two-decimal values and are carried as cents
//! inside the engine.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fundbridge_core::campaign::CampaignStatus;
use fundbridge_core::money::cents_from_decimal;
use fundbridge_core::types::DbId;
use fundbridge_db::models::campaign::{CreateCampaign, UpdateCampaign};
use fundbridge_engine::store::FundingStore;
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::optional_cents;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /campaigns`.
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub description: Option<String>,
    pub goal_amount: f64,
    pub beneficiary_id: Option<DbId>,
}

/// Body of `PATCH /campaigns/{id}`. Only non-ledger fields are accepted.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditCampaignRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal_amount: Option<f64>,
    pub beneficiary_id: Option<DbId>,
    pub status: Option<CampaignStatus>,
}

/// POST /api/v1/campaigns
pub async fn create_campaign<S: FundingStore>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
    Json(body): Json<CreateCampaignRequest>,
) -> AppResult<impl IntoResponse> {
    let input = CreateCampaign {
        title: body.title,
        description: body.description,
        goal_cents: cents_from_decimal(body.goal_amount)?,
        beneficiary_id: body.beneficiary_id,
    };
    let campaign = state
        .engine
        .campaigns
        .create_campaign(&auth.actor(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: campaign })))
}

/// GET /api/v1/campaigns/{id}
pub async fn get_campaign<S: FundingStore>(
    State(state): State<AppState<S>>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let campaign = state.engine.campaigns.get_campaign(id).await?;
    Ok(Json(DataResponse { data: campaign }))
}

/// PATCH /api/v1/campaigns/{id}
pub async fn edit_campaign<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(body): Json<EditCampaignRequest>,
) -> AppResult<impl IntoResponse> {
    let input = UpdateCampaign {
        title: body.title,
        description: body.description,
        goal_cents: optional_cents(body.goal_amount)?,
        beneficiary_id: body.beneficiary_id,
        status: body.status,
    };
    let campaign = state
        .engine
        .campaigns
        .edit_campaign(id, input, &admin.actor())
        .await?;
    Ok(Json(DataResponse { data: campaign }))
}

/// DELETE /api/v1/campaigns/{id}
pub async fn delete_campaign<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state
        .engine
        .campaigns
        .delete_campaign(id, &admin.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
