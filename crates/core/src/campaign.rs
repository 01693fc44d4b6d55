//! Campaign lifecycle statuses, moderation rules, and ledger arithmetic.
//!
//! The arithmetic here is the single definition of the derived campaign
//! statistics. The PostgreSQL ledger statement and the in-memory store both
//! follow it.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::money::MAX_AMOUNT_CENTS;
use crate::types::Cents;

/// Maximum campaign title length.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum campaign description length.
pub const MAX_DESCRIPTION_LENGTH: usize = 20_000;

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Pending,
    Approved,
    Live,
    Paused,
    Completed,
    Cancelled,
    Rejected,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Live => "live",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Only approved and live campaigns take new donations.
    pub fn accepts_donations(self) -> bool {
        matches!(self, Self::Approved | Self::Live)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Moderation transition table applied to administrator edits.
    pub fn can_transition_to(self, next: Self) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Draft, Cancelled)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Live)
                | (Approved, Cancelled)
                | (Live, Paused)
                | (Live, Completed)
                | (Live, Cancelled)
                | (Paused, Live)
                | (Paused, Cancelled)
                | (Rejected, Draft)
        )
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a moderation status change. Same-status edits are no-ops.
pub fn validate_status_change(
    current: CampaignStatus,
    next: CampaignStatus,
) -> Result<(), CoreError> {
    if current == next || current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Campaign cannot move from '{current}' to '{next}'"
        )))
    }
}

pub fn validate_title(title: &str) -> Result<(), CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Campaign title must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Campaign title exceeds {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), CoreError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "Campaign description exceeds {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_goal(goal_cents: Cents) -> Result<(), CoreError> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&goal_cents) {
        return Err(CoreError::Validation(format!(
            "Goal amount must be between 0 and {MAX_AMOUNT_CENTS} cents"
        )));
    }
    Ok(())
}

/* --------------------------------------------------------------------------
Ledger arithmetic
-------------------------------------------------------------------------- */

/// `min(raised / goal, 1) * 100`, or 0 when the goal is not positive.
pub fn completion_percentage(raised_cents: Cents, goal_cents: Cents) -> f64 {
    if goal_cents <= 0 {
        return 0.0;
    }
    (raised_cents as f64 / goal_cents as f64).min(1.0) * 100.0
}

/// Integer average in cents; 0 when there are no donations.
pub fn average_donation(raised_cents: Cents, donation_count: i64) -> Cents {
    if donation_count <= 0 {
        0
    } else {
        raised_cents / donation_count
    }
}

/// Whether a refund returns everything the donation credited.
pub fn is_full_refund(refund_cents: Cents, donation_cents: Cents) -> bool {
    refund_cents >= donation_cents
}

/// A live campaign completes once it reaches its goal.
pub fn should_auto_complete(status: CampaignStatus, raised_cents: Cents, goal_cents: Cents) -> bool {
    status == CampaignStatus::Live && raised_cents >= goal_cents
}

/// The accumulator fields the ledger maintains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerTotals {
    pub raised_cents: Cents,
    pub goal_cents: Cents,
    pub donation_count: i64,
    pub unique_donors: i64,
    pub status: CampaignStatus,
}

/// Result of applying a credit or reversal to [`LedgerTotals`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerDelta {
    pub totals: LedgerTotals,
    pub average_donation_cents: Cents,
    pub completion_percentage: f64,
    /// `true` when this delta moved the campaign from live to completed.
    pub auto_completed: bool,
}

impl LedgerTotals {
    /// Apply one completed donation.
    pub fn credit(self, amount_cents: Cents, new_donor: bool) -> LedgerDelta {
        let raised = self.raised_cents + amount_cents;
        let count = self.donation_count + 1;
        let auto_completed = should_auto_complete(self.status, raised, self.goal_cents);
        let totals = LedgerTotals {
            raised_cents: raised,
            goal_cents: self.goal_cents,
            donation_count: count,
            unique_donors: self.unique_donors + i64::from(new_donor),
            status: if auto_completed {
                CampaignStatus::Completed
            } else {
                self.status
            },
        };
        totals.delta(auto_completed)
    }

    /// Reverse `refund_cents` of a donation that credited `donation_cents`.
    ///
    /// The donation stops counting only when the refund covers all of it.
    /// Status never moves back.
    pub fn reverse(self, refund_cents: Cents, donation_cents: Cents) -> LedgerDelta {
        let withdrawn = i64::from(is_full_refund(refund_cents, donation_cents));
        let totals = LedgerTotals {
            raised_cents: (self.raised_cents - refund_cents).max(0),
            donation_count: (self.donation_count - withdrawn).max(0),
            ..self
        };
        totals.delta(false)
    }

    /// Recompute derived stats after a goal edit, applying auto-completion.
    pub fn with_goal(self, goal_cents: Cents) -> LedgerDelta {
        let auto_completed = should_auto_complete(self.status, self.raised_cents, goal_cents);
        let totals = LedgerTotals {
            goal_cents,
            status: if auto_completed {
                CampaignStatus::Completed
            } else {
                self.status
            },
            ..self
        };
        totals.delta(auto_completed)
    }

    fn delta(self, auto_completed: bool) -> LedgerDelta {
        LedgerDelta {
            average_donation_cents: average_donation(self.raised_cents, self.donation_count),
            completion_percentage: completion_percentage(self.raised_cents, self.goal_cents),
            totals: self,
            auto_completed,
        }
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
