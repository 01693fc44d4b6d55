//! Campaign entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fundbridge_core::campaign::{CampaignStatus, LedgerTotals};
use fundbridge_core::types::{Cents, DbId, Timestamp};

/// Derived statistics maintained by the ledger.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Default)]
pub struct CampaignStats {
    pub donation_count: i64,
    pub unique_donors: i64,
    pub average_donation_cents: Cents,
    pub completion_percentage: f64,
    pub last_donation_at: Option<Timestamp>,
}

/// A row from the `campaigns` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Campaign {
    pub id: DbId,
    pub creator_id: DbId,
    pub beneficiary_id: Option<DbId>,
    pub title: String,
    pub description: String,
    pub goal_cents: Cents,
    pub raised_cents: Cents,
    pub status: CampaignStatus,
    #[sqlx(flatten)]
    pub stats: CampaignStats,
    pub completed_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Campaign {
    /// Snapshot of the ledger-maintained fields.
    pub fn ledger_totals(&self) -> LedgerTotals {
        LedgerTotals {
            raised_cents: self.raised_cents,
            goal_cents: self.goal_cents,
            donation_count: self.stats.donation_count,
            unique_donors: self.stats.unique_donors,
            status: self.status,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A campaign row returned together with the status it held before the write.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignTransition {
    #[sqlx(flatten)]
    pub campaign: Campaign,
    pub prev_status: CampaignStatus,
}

impl CampaignTransition {
    /// `true` when the write moved a live campaign to completed.
    pub fn auto_completed(&self) -> bool {
        self.prev_status == CampaignStatus::Live && self.campaign.status == CampaignStatus::Completed
    }

    pub fn status_changed(&self) -> bool {
        self.prev_status != self.campaign.status
    }
}

/// DTO for creating a new campaign. New campaigns start as drafts.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaign {
    pub title: String,
    pub description: Option<String>,
    pub goal_cents: Cents,
    pub beneficiary_id: Option<DbId>,
}

/// Administrator edit. Only non-ledger fields are editable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateCampaign {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal_cents: Option<Cents>,
    pub beneficiary_id: Option<DbId>,
    pub status: Option<CampaignStatus>,
}

impl UpdateCampaign {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.goal_cents.is_none()
            && self.beneficiary_id.is_none()
            && self.status.is_none()
    }
}
