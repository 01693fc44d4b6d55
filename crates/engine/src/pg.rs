//! [`FundingStore`] backed by PostgreSQL through the `fundbridge-db`
//! repositories. Every call is bounded by a timeout so a stalled database
//! surfaces as [`StoreError::Timeout`] instead of hanging the caller.

use std::future::Future;
use std::time::Duration;

use fundbridge_core::campaign::CampaignStatus;
use fundbridge_core::donation::PaymentStatus;
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
use fundbridge_db::repositories::{
    AuditLogRepo, CampaignRepo, DonationRepo, LedgerRepo, NotificationRepo, TaskRepo,
};
use fundbridge_db::DbPool;

use crate::store::{
    AuditStore, CampaignStore, DonationStore, FundingStore, NotificationStore, StoreError,
    StoreResult, TaskStore,
};

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// PostgreSQL store with a per-call timeout.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: DbPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run `fut` under the configured timeout and classify its error.
    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(classify(op, err)),
            Err(_) => {
                tracing::warn!(
                    op,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Store call timed out",
                );
                Err(StoreError::Timeout)
            }
        }
    }
}

/// Map a sqlx error onto the engine's store error classes.
fn classify(op: &'static str, err: sqlx::Error) -> StoreError {
    if let Some(constraint) = fundbridge_db::unique_violation(&err) {
        return StoreError::UniqueViolation { constraint };
    }
    match err {
        sqlx::Error::PoolTimedOut => {
            tracing::warn!(op, "Connection pool exhausted");
            StoreError::Timeout
        }
        other => {
            tracing::error!(op, error = %other, "Store call failed");
            StoreError::Backend(other.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

impl CampaignStore for PgStore {
    async fn insert_campaign(
        &self,
        creator_id: DbId,
        input: &CreateCampaign,
    ) -> StoreResult<Campaign> {
        self.bounded("insert_campaign", CampaignRepo::create(&self.pool, creator_id, input))
            .await
    }

    async fn find_campaign(&self, id: DbId) -> StoreResult<Option<Campaign>> {
        self.bounded("find_campaign", CampaignRepo::find_by_id(&self.pool, id))
            .await
    }

    async fn update_campaign(
        &self,
        id: DbId,
        expected: CampaignStatus,
        input: &UpdateCampaign,
    ) -> StoreResult<Option<CampaignTransition>> {
        self.bounded(
            "update_campaign",
            CampaignRepo::update(&self.pool, id, expected, input),
        )
        .await
    }

    async fn soft_delete_campaign(&self, id: DbId) -> StoreResult<bool> {
        self.bounded("soft_delete_campaign", CampaignRepo::soft_delete(&self.pool, id))
            .await
    }
}

// ---------------------------------------------------------------------------
// Donations
// ---------------------------------------------------------------------------

impl DonationStore for PgStore {
    async fn insert_donation(&self, input: &NewDonation) -> StoreResult<Donation> {
        self.bounded("insert_donation", DonationRepo::create(&self.pool, input))
            .await
    }

    async fn find_donation(&self, id: DbId) -> StoreResult<Option<Donation>> {
        self.bounded("find_donation", DonationRepo::find_by_id(&self.pool, id))
            .await
    }

    async fn find_donation_by_external_id(
        &self,
        external_payment_id: &str,
    ) -> StoreResult<Option<Donation>> {
        self.bounded(
            "find_donation_by_external_id",
            DonationRepo::find_by_external_payment_id(&self.pool, external_payment_id),
        )
        .await
    }

    async fn transition_payment_status(
        &self,
        id: DbId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> StoreResult<Option<Donation>> {
        self.bounded(
            "transition_payment_status",
            DonationRepo::transition_status(&self.pool, id, from, to),
        )
        .await
    }

    async fn apply_to_ledger(&self, donation_id: DbId) -> StoreResult<Option<LedgerApplication>> {
        self.bounded(
            "apply_to_ledger",
            LedgerRepo::apply_completed_donation(&self.pool, donation_id),
        )
        .await
    }

    async fn refund_donation(
        &self,
        id: DbId,
        refund: &RefundRequest,
    ) -> StoreResult<Option<RefundOutcome>> {
        self.bounded("refund_donation", DonationRepo::refund(&self.pool, id, refund))
            .await
    }

    async fn list_unledgered(&self, limit: i64) -> StoreResult<Vec<Donation>> {
        self.bounded("list_unledgered", DonationRepo::list_unledgered(&self.pool, limit))
            .await
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

impl TaskStore for PgStore {
    async fn insert_task(&self, created_by: DbId, input: &CreateTask) -> StoreResult<Task> {
        self.bounded("insert_task", TaskRepo::create(&self.pool, created_by, input))
            .await
    }

    async fn find_task(&self, id: DbId) -> StoreResult<Option<Task>> {
        self.bounded("find_task", TaskRepo::find_by_id(&self.pool, id))
            .await
    }

    async fn try_claim_task(&self, id: DbId, volunteer_id: DbId) -> StoreResult<Option<Task>> {
        self.bounded("try_claim_task", TaskRepo::try_claim(&self.pool, id, volunteer_id))
            .await
    }

    async fn record_task_progress(
        &self,
        id: DbId,
        write: &ProgressWrite,
    ) -> StoreResult<Option<(Task, TaskUpdate)>> {
        self.bounded(
            "record_task_progress",
            TaskRepo::record_progress(&self.pool, id, write),
        )
        .await
    }

    async fn review_task(&self, id: DbId, write: &ReviewWrite) -> StoreResult<Option<Task>> {
        self.bounded("review_task", TaskRepo::review(&self.pool, id, write))
            .await
    }

    async fn cancel_task(&self, id: DbId, write: &CancelWrite) -> StoreResult<Option<Task>> {
        self.bounded("cancel_task", TaskRepo::cancel(&self.pool, id, write))
            .await
    }

    async fn list_task_updates(&self, task_id: DbId) -> StoreResult<Vec<TaskUpdate>> {
        self.bounded("list_task_updates", TaskRepo::list_updates(&self.pool, task_id))
            .await
    }

    async fn mark_overdue_tasks(&self) -> StoreResult<Vec<Task>> {
        self.bounded("mark_overdue_tasks", TaskRepo::mark_overdue(&self.pool))
            .await
    }
}

// ---------------------------------------------------------------------------
// Audit and notifications
// ---------------------------------------------------------------------------

impl AuditStore for PgStore {
    async fn append_audit(&self, entry: &NewAuditLog) -> StoreResult<AuditLog> {
        self.bounded("append_audit", AuditLogRepo::append(&self.pool, entry))
            .await
    }

    async fn query_audit(&self, params: &AuditQuery) -> StoreResult<AuditLogPage> {
        self.bounded("query_audit", AuditLogRepo::query(&self.pool, params))
            .await
    }
}

impl NotificationStore for PgStore {
    async fn create_notification(&self, input: &NewNotification) -> StoreResult<Notification> {
        self.bounded("create_notification", NotificationRepo::create(&self.pool, input))
            .await
    }

    async fn list_notifications(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        self.bounded(
            "list_notifications",
            NotificationRepo::list_for_user(&self.pool, user_id, unread_only, limit, offset),
        )
        .await
    }

    async fn mark_notification_read(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        self.bounded(
            "mark_notification_read",
            NotificationRepo::mark_read(&self.pool, id, user_id),
        )
        .await
    }

    async fn mark_all_notifications_read(&self, user_id: DbId) -> StoreResult<u64> {
        self.bounded(
            "mark_all_notifications_read",
            NotificationRepo::mark_all_read(&self.pool, user_id),
        )
        .await
    }

    async fn unread_notification_count(&self, user_id: DbId) -> StoreResult<i64> {
        self.bounded(
            "unread_notification_count",
            NotificationRepo::unread_count(&self.pool, user_id),
        )
        .await
    }

    async fn purge_expired_notifications(&self) -> StoreResult<u64> {
        self.bounded(
            "purge_expired_notifications",
            NotificationRepo::delete_expired(&self.pool),
        )
        .await
    }
}

impl FundingStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        self.bounded("ping", fundbridge_db::health_check(&self.pool))
            .await
    }
}
