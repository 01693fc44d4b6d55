//! Handlers for donations and payment confirmations.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fundbridge_core::donation::{AnonymousDonor, PaymentMethod, PaymentStatus};
use fundbridge_core::money::cents_from_decimal;
use fundbridge_core::types::DbId;
use fundbridge_engine::donations::RecordDonation;
use fundbridge_engine::store::FundingStore;
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::optional_cents;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireSystem};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /donations`.
#[derive(Debug, Deserialize)]
pub struct RecordDonationRequest {
    pub campaign_id: DbId,
    pub donor_id: Option<DbId>,
    pub anonymous_donor: Option<AnonymousDonor>,
    pub amount: f64,
    pub transaction_fee: Option<f64>,
    pub payment_method: PaymentMethod,
    pub external_payment_id: String,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequestBody {
    pub amount: f64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentConfirmation {
    pub external_payment_id: String,
    pub status: PaymentStatus,
}

/// POST /api/v1/donations
///
/// 201 for a new donation, 200 when the payment id was already recorded.
pub async fn record_donation<S: FundingStore>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
    Json(body): Json<RecordDonationRequest>,
) -> AppResult<impl IntoResponse> {
    let input = RecordDonation {
        campaign_id: body.campaign_id,
        donor_id: body.donor_id,
        anonymous_donor: body.anonymous_donor,
        amount_cents: cents_from_decimal(body.amount)?,
        transaction_fee_cents: optional_cents(body.transaction_fee)?,
        payment_method: body.payment_method,
        external_payment_id: body.external_payment_id,
        payment_status: body.payment_status,
    };
    let recorded = state
        .engine
        .donations
        .record_donation(&auth.actor(), input)
        .await?;

    let status = if recorded.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(DataResponse { data: recorded })))
}

/// GET /api/v1/donations/{id}
pub async fn get_donation<S: FundingStore>(
    State(state): State<AppState<S>>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let donation = state
        .engine
        .donations
        .get_donation(&auth.actor(), id)
        .await?;
    Ok(Json(DataResponse { data: donation }))
}

/// POST /api/v1/donations/{id}/refund
pub async fn refund_donation<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(body): Json<RefundRequestBody>,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .engine
        .donations
        .refund_donation(&admin.actor(), id, cents_from_decimal(body.amount)?, &body.reason)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/payments/confirmations
pub async fn confirm_payment<S: FundingStore>(
    State(state): State<AppState<S>>,
    RequireSystem(processor): RequireSystem,
    Json(body): Json<PaymentConfirmation>,
) -> AppResult<impl IntoResponse> {
    let donation = state
        .engine
        .donations
        .confirm_payment(&processor.actor(), &body.external_payment_id, body.status)
        .await?;
    Ok(Json(DataResponse { data: donation }))
}
