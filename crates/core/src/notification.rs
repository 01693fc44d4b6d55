//! Notification types and expiry policy.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Default lifetime of a notification before the expiry job purges it.
pub const DEFAULT_TTL_DAYS: i64 = 90;

/// Maximum page size for notification listing.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Default page size for notification listing.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum NotificationType {
    DonationReceived,
    RefundProcessed,
    CampaignCompleted,
    CampaignStatusChanged,
    TaskAssigned,
    TaskReviewRequested,
    TaskApproved,
    TaskRevisionRequested,
    TaskRejected,
    TaskCancelled,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DonationReceived => "donation_received",
            Self::RefundProcessed => "refund_processed",
            Self::CampaignCompleted => "campaign_completed",
            Self::CampaignStatusChanged => "campaign_status_changed",
            Self::TaskAssigned => "task_assigned",
            Self::TaskReviewRequested => "task_review_requested",
            Self::TaskApproved => "task_approved",
            Self::TaskRevisionRequested => "task_revision_requested",
            Self::TaskRejected => "task_rejected",
            Self::TaskCancelled => "task_cancelled",
        }
    }
}

/// Expiry timestamp for a notification created at `created_at`.
pub fn expires_at(created_at: Timestamp) -> Timestamp {
    created_at + Duration::days(DEFAULT_TTL_DAYS)
}

/// Clamp caller-supplied pagination to the allowed window.
pub fn clamp_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn expiry_is_ninety_days_out() {
        let now = Utc::now();
        assert_eq!(expires_at(now) - now, Duration::days(90));
    }

    #[test]
    fn page_is_clamped() {
        assert_eq!(clamp_page(None, None), (50, 0));
        assert_eq!(clamp_page(Some(1_000), Some(-3)), (100, 0));
        assert_eq!(clamp_page(Some(0), Some(20)), (1, 20));
    }

    #[test]
    fn type_names_are_snake_case() {
        assert_eq!(NotificationType::DonationReceived.as_str(), "donation_received");
        assert_eq!(
            serde_json::to_value(NotificationType::TaskRevisionRequested).unwrap(),
            "task_revision_requested"
        );
    }
}
