//! Donation entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use fundbridge_core::donation::{AnonymousDonor, PaymentMethod, PaymentStatus};
use fundbridge_core::types::{Cents, DbId, Timestamp};

use crate::models::campaign::Campaign;

/// A row from the `donations` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Donation {
    pub id: DbId,
    pub campaign_id: DbId,
    pub donor_id: Option<DbId>,
    pub anonymous_donor: Option<Json<AnonymousDonor>>,
    pub amount_cents: Cents,
    pub transaction_fee_cents: Cents,
    pub net_amount_cents: Cents,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub external_payment_id: String,
    pub receipt_number: String,
    pub recorded_by: Option<DbId>,
    pub ledgered_at: Option<Timestamp>,
    pub refund_amount_cents: Option<Cents>,
    pub refund_reason: Option<String>,
    pub refunded_by: Option<DbId>,
    pub refunded_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Donation {
    pub fn is_anonymous(&self) -> bool {
        self.donor_id.is_none()
    }

    pub fn is_ledgered(&self) -> bool {
        self.ledgered_at.is_some()
    }
}

/// Fully validated insert for a donation row.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub campaign_id: DbId,
    pub donor_id: Option<DbId>,
    pub anonymous_donor: Option<AnonymousDonor>,
    pub amount_cents: Cents,
    pub transaction_fee_cents: Cents,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub external_payment_id: String,
    pub receipt_number: String,
    pub recorded_by: Option<DbId>,
}

/// Refund details applied to a completed donation.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    pub amount_cents: Cents,
    pub reason: String,
    pub refunded_by: DbId,
}

/// The single application of a completed donation to its campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerApplication {
    pub donation_id: DbId,
    pub donor_id: Option<DbId>,
    pub receipt_number: String,
    pub amount_cents: Cents,
    pub new_donor: bool,
    pub auto_completed: bool,
    pub campaign: Campaign,
}

/// Result of a refund: the updated donation and, when the donation had
/// been ledgered, the campaign after reversal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefundOutcome {
    pub donation: Donation,
    pub campaign: Option<Campaign>,
}
