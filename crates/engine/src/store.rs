//! The injected store-client capability.
//!
//! Components receive a [`FundingStore`] at construction instead of reaching
//! for a global connection. Each method is one atomic primitive: a plain
//! read, an insert, an atomic increment, or a conditional update that
//! reports `None` when its guard no longer holds.

use std::future::Future;

use fundbridge_core::campaign::CampaignStatus;
use fundbridge_core::donation::PaymentStatus;
use fundbridge_core::error::CoreError;
use fundbridge_core::types::DbId;
use fundbridge_db::models::audit::{AuditLog, AuditLogPage, AuditQuery, NewAuditLog};
use fundbridge_db::models::campaign::{Campaign, CampaignTransition, CreateCampaign, UpdateCampaign};
use fundbridge_db::models::donation::{
    Donation, LedgerApplication, NewDonation, RefundOutcome, RefundRequest,
};
use fundbridge_db::models::notification::{NewNotification, Notification};
use fundbridge_db::models::task::{
    CancelWrite, CreateTask, ProgressWrite, ReviewWrite, Task, TaskUpdate,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Store failure classes the engine reacts to.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Store call timed out")]
    Timeout,

    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_unique_violation(&self, name: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint } if constraint == name)
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { constraint } => {
                CoreError::Conflict(format!("Duplicate value violates {constraint}"))
            }
            StoreError::Timeout => {
                CoreError::ServiceUnavailable("The data store did not respond in time".into())
            }
            StoreError::Backend(msg) => CoreError::Internal(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Constraint backing receipt-number uniqueness.
pub const RECEIPT_CONSTRAINT: &str = "uq_donations_receipt_number";

/// Constraint backing idempotency on the processor's payment id.
pub const EXTERNAL_PAYMENT_CONSTRAINT: &str = "uq_donations_external_payment_id";

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait CampaignStore {
    fn insert_campaign(
        &self,
        creator_id: DbId,
        input: &CreateCampaign,
    ) -> impl Future<Output = StoreResult<Campaign>> + Send;

    /// Active (not soft-deleted) campaign.
    fn find_campaign(&self, id: DbId) -> impl Future<Output = StoreResult<Option<Campaign>>> + Send;

    /// Edit non-ledger fields while the campaign is still in `expected`.
    fn update_campaign(
        &self,
        id: DbId,
        expected: CampaignStatus,
        input: &UpdateCampaign,
    ) -> impl Future<Output = StoreResult<Option<CampaignTransition>>> + Send;

    fn soft_delete_campaign(&self, id: DbId) -> impl Future<Output = StoreResult<bool>> + Send;
}

pub trait DonationStore {
    fn insert_donation(
        &self,
        input: &NewDonation,
    ) -> impl Future<Output = StoreResult<Donation>> + Send;

    fn find_donation(&self, id: DbId) -> impl Future<Output = StoreResult<Option<Donation>>> + Send;

    fn find_donation_by_external_id(
        &self,
        external_payment_id: &str,
    ) -> impl Future<Output = StoreResult<Option<Donation>>> + Send;

    fn transition_payment_status(
        &self,
        id: DbId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> impl Future<Output = StoreResult<Option<Donation>>> + Send;

    /// Claim the donation for the ledger and increment its campaign, once.
    fn apply_to_ledger(
        &self,
        donation_id: DbId,
    ) -> impl Future<Output = StoreResult<Option<LedgerApplication>>> + Send;

    fn refund_donation(
        &self,
        id: DbId,
        refund: &RefundRequest,
    ) -> impl Future<Output = StoreResult<Option<RefundOutcome>>> + Send;

    fn list_unledgered(&self, limit: i64)
        -> impl Future<Output = StoreResult<Vec<Donation>>> + Send;
}

pub trait TaskStore {
    fn insert_task(
        &self,
        created_by: DbId,
        input: &CreateTask,
    ) -> impl Future<Output = StoreResult<Task>> + Send;

    fn find_task(&self, id: DbId) -> impl Future<Output = StoreResult<Option<Task>>> + Send;

    fn try_claim_task(
        &self,
        id: DbId,
        volunteer_id: DbId,
    ) -> impl Future<Output = StoreResult<Option<Task>>> + Send;

    fn record_task_progress(
        &self,
        id: DbId,
        write: &ProgressWrite,
    ) -> impl Future<Output = StoreResult<Option<(Task, TaskUpdate)>>> + Send;

    fn review_task(
        &self,
        id: DbId,
        write: &ReviewWrite,
    ) -> impl Future<Output = StoreResult<Option<Task>>> + Send;

    fn cancel_task(
        &self,
        id: DbId,
        write: &CancelWrite,
    ) -> impl Future<Output = StoreResult<Option<Task>>> + Send;

    fn list_task_updates(
        &self,
        task_id: DbId,
    ) -> impl Future<Output = StoreResult<Vec<TaskUpdate>>> + Send;

    fn mark_overdue_tasks(&self) -> impl Future<Output = StoreResult<Vec<Task>>> + Send;
}

pub trait AuditStore {
    fn append_audit(
        &self,
        entry: &NewAuditLog,
    ) -> impl Future<Output = StoreResult<AuditLog>> + Send;

    fn query_audit(
        &self,
        params: &AuditQuery,
    ) -> impl Future<Output = StoreResult<AuditLogPage>> + Send;
}

pub trait NotificationStore {
    fn create_notification(
        &self,
        input: &NewNotification,
    ) -> impl Future<Output = StoreResult<Notification>> + Send;

    fn list_notifications(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = StoreResult<Vec<Notification>>> + Send;

    fn mark_notification_read(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    fn mark_all_notifications_read(
        &self,
        user_id: DbId,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    fn unread_notification_count(
        &self,
        user_id: DbId,
    ) -> impl Future<Output = StoreResult<i64>> + Send;

    fn purge_expired_notifications(&self) -> impl Future<Output = StoreResult<u64>> + Send;
}

/// Everything the engine needs from persistence.
pub trait FundingStore:
    CampaignStore + DonationStore + TaskStore + AuditStore + NotificationStore
    + Clone + Send + Sync + 'static
{
    /// Liveness probe for health checks.
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;
}
