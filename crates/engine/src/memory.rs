//! In-process [`FundingStore`] for tests and local runs.
//!
//! Each method takes the state lock once, so every primitive is atomic in
//! the same sense as its SQL counterpart. Unique constraints on receipt
//! numbers and external payment ids are enforced with the same constraint
//! names PostgreSQL reports. Side-channel failures can be injected to
//! exercise best-effort paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use sqlx::types::Json;
use fundbridge_core::audit::compute_integrity_hash;
use fundbridge_core::campaign::{CampaignStatus, LedgerDelta};
use fundbridge_core::donation::{net_amount, PaymentStatus};
use fundbridge_core::notification::expires_at;
use fundbridge_core::task::{ReviewDecision, TaskStatus};
use fundbridge_core::types::DbId;
use fundbridge_db::models::audit::{AuditLog, AuditLogPage, AuditQuery, NewAuditLog};
use fundbridge_db::models::campaign::{
    Campaign, CampaignStats, CampaignTransition, CreateCampaign, UpdateCampaign,
};
use fundbridge_db::models::donation::{
    Donation, LedgerApplication, NewDonation, RefundOutcome, RefundRequest,
};
use fundbridge_db::models::notification::{NewNotification, Notification};
use fundbridge_db::models::task::{
    CancelWrite, CreateTask, ProgressWrite, ReviewWrite, Task, TaskUpdate,
};

use crate::store::{
    AuditStore, CampaignStore, DonationStore, FundingStore, NotificationStore, StoreError,
    StoreResult, TaskStore, EXTERNAL_PAYMENT_CONSTRAINT, RECEIPT_CONSTRAINT,
};

#[derive(Default)]
struct State {
    next_id: DbId,
    campaigns: BTreeMap<DbId, Campaign>,
    donations: BTreeMap<DbId, Donation>,
    tasks: BTreeMap<DbId, Task>,
    task_updates: Vec<TaskUpdate>,
    audit_logs: Vec<AuditLog>,
    notifications: BTreeMap<DbId, Notification>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
struct Faults {
    audit: AtomicBool,
    notifications: AtomicBool,
    ledger: AtomicBool,
    receipt_collisions: AtomicUsize,
}

/// Shared, cloneable in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every audit append fail.
    pub fn fail_audit(&self, fail: bool) {
        self.faults.audit.store(fail, Ordering::SeqCst);
    }

    /// Make every notification insert fail.
    pub fn fail_notifications(&self, fail: bool) {
        self.faults.notifications.store(fail, Ordering::SeqCst);
    }

    /// Make every ledger application fail, leaving donations unledgered.
    pub fn fail_ledger(&self, fail: bool) {
        self.faults.ledger.store(fail, Ordering::SeqCst);
    }

    /// Report the next `n` donation inserts as receipt-number collisions.
    pub fn fail_receipts(&self, n: usize) {
        self.faults.receipt_collisions.store(n, Ordering::SeqCst);
    }

    /// Force a campaign into `status`, bypassing moderation rules.
    pub fn set_campaign_status(&self, id: DbId, status: CampaignStatus) -> StoreResult<()> {
        let mut state = self.lock()?;
        let campaign = state
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("no campaign {id}")))?;
        campaign.status = status;
        Ok(())
    }

    /// Move a task's deadline, e.g. into the past.
    pub fn set_task_deadline(
        &self,
        id: DbId,
        deadline: Option<fundbridge_core::types::Timestamp>,
    ) -> StoreResult<()> {
        let mut state = self.lock()?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("no task {id}")))?;
        task.deadline = deadline;
        Ok(())
    }

    /// All audit entries, oldest first.
    pub fn audit_entries(&self) -> StoreResult<Vec<AuditLog>> {
        Ok(self.lock()?.audit_logs.clone())
    }

    /// All notifications, by id.
    pub fn notifications(&self) -> StoreResult<Vec<Notification>> {
        Ok(self.lock()?.notifications.values().cloned().collect())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

fn apply_delta(campaign: &mut Campaign, delta: &LedgerDelta) {
    let now = Utc::now();
    campaign.raised_cents = delta.totals.raised_cents;
    campaign.goal_cents = delta.totals.goal_cents;
    campaign.status = delta.totals.status;
    campaign.stats.donation_count = delta.totals.donation_count;
    campaign.stats.unique_donors = delta.totals.unique_donors;
    campaign.stats.average_donation_cents = delta.average_donation_cents;
    campaign.stats.completion_percentage = delta.completion_percentage;
    if delta.totals.status == CampaignStatus::Completed {
        campaign.completed_at.get_or_insert(now);
    }
    campaign.updated_at = now;
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

impl CampaignStore for MemoryStore {
    async fn insert_campaign(
        &self,
        creator_id: DbId,
        input: &CreateCampaign,
    ) -> StoreResult<Campaign> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        let now = Utc::now();
        let campaign = Campaign {
            id: state.next_id(),
            creator_id,
            beneficiary_id: input.beneficiary_id,
            title: input.title.trim().to_string(),
            description: input.description.clone().unwrap_or_default(),
            goal_cents: input.goal_cents,
            raised_cents: 0,
            status: CampaignStatus::Draft,
            stats: CampaignStats::default(),
            completed_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn find_campaign(&self, id: DbId) -> StoreResult<Option<Campaign>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        Ok(state.campaigns.get(&id).filter(|c| !c.is_deleted()).cloned())
    }

    async fn update_campaign(
        &self,
        id: DbId,
        expected: CampaignStatus,
        input: &UpdateCampaign,
    ) -> StoreResult<Option<CampaignTransition>> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        let Some(campaign) = state
            .campaigns
            .get_mut(&id)
            .filter(|c| !c.is_deleted() && c.status == expected)
        else {
            return Ok(None);
        };

        let prev_status = campaign.status;
        if let Some(title) = &input.title {
            campaign.title = title.trim().to_string();
        }
        if let Some(description) = &input.description {
            campaign.description = description.clone();
        }
        if let Some(beneficiary_id) = input.beneficiary_id {
            campaign.beneficiary_id = Some(beneficiary_id);
        }
        if let Some(status) = input.status {
            campaign.status = status;
        }
        let goal = input.goal_cents.unwrap_or(campaign.goal_cents);
        let delta = campaign.ledger_totals().with_goal(goal);
        apply_delta(campaign, &delta);

        Ok(Some(CampaignTransition {
            campaign: campaign.clone(),
            prev_status,
        }))
    }

    async fn soft_delete_campaign(&self, id: DbId) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        match state.campaigns.get_mut(&id).filter(|c| !c.is_deleted()) {
            Some(campaign) => {
                let now = Utc::now();
                campaign.deleted_at = Some(now);
                campaign.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Donations
// ---------------------------------------------------------------------------

impl DonationStore for MemoryStore {
    async fn insert_donation(&self, input: &NewDonation) -> StoreResult<Donation> {
        tokio::task::yield_now().await;
        let collided = self
            .faults
            .receipt_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if collided {
            return Err(StoreError::UniqueViolation {
                constraint: RECEIPT_CONSTRAINT.into(),
            });
        }
        let mut state = self.lock()?;
        if !state.campaigns.contains_key(&input.campaign_id) {
            return Err(StoreError::Backend(format!(
                "foreign key violation: campaign {}",
                input.campaign_id
            )));
        }
        for existing in state.donations.values() {
            if existing.receipt_number == input.receipt_number {
                return Err(StoreError::UniqueViolation {
                    constraint: RECEIPT_CONSTRAINT.into(),
                });
            }
            if existing.external_payment_id == input.external_payment_id {
                return Err(StoreError::UniqueViolation {
                    constraint: EXTERNAL_PAYMENT_CONSTRAINT.into(),
                });
            }
        }

        let now = Utc::now();
        let donation = Donation {
            id: state.next_id(),
            campaign_id: input.campaign_id,
            donor_id: input.donor_id,
            anonymous_donor: input.anonymous_donor.clone().map(Json),
            amount_cents: input.amount_cents,
            transaction_fee_cents: input.transaction_fee_cents,
            net_amount_cents: net_amount(input.amount_cents, input.transaction_fee_cents),
            payment_method: input.payment_method,
            payment_status: input.payment_status,
            external_payment_id: input.external_payment_id.clone(),
            receipt_number: input.receipt_number.clone(),
            recorded_by: input.recorded_by,
            ledgered_at: None,
            refund_amount_cents: None,
            refund_reason: None,
            refunded_by: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };
        state.donations.insert(donation.id, donation.clone());
        Ok(donation)
    }

    async fn find_donation(&self, id: DbId) -> StoreResult<Option<Donation>> {
        tokio::task::yield_now().await;
        Ok(self.lock()?.donations.get(&id).cloned())
    }

    async fn find_donation_by_external_id(
        &self,
        external_payment_id: &str,
    ) -> StoreResult<Option<Donation>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        Ok(state
            .donations
            .values()
            .find(|d| d.external_payment_id == external_payment_id)
            .cloned())
    }

    async fn transition_payment_status(
        &self,
        id: DbId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> StoreResult<Option<Donation>> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        match state
            .donations
            .get_mut(&id)
            .filter(|d| d.payment_status == from)
        {
            Some(donation) => {
                donation.payment_status = to;
                donation.updated_at = Utc::now();
                Ok(Some(donation.clone()))
            }
            None => Ok(None),
        }
    }

    async fn apply_to_ledger(&self, donation_id: DbId) -> StoreResult<Option<LedgerApplication>> {
        tokio::task::yield_now().await;
        if self.faults.ledger.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected ledger failure".into()));
        }
        let mut state = self.lock()?;
        let now = Utc::now();

        let Some(donation) = state.donations.get(&donation_id).filter(|d| {
            d.ledgered_at.is_none() && d.payment_status == PaymentStatus::Completed
        }) else {
            return Ok(None);
        };
        let (campaign_id, donor_id, amount_cents) =
            (donation.campaign_id, donation.donor_id, donation.amount_cents);
        let receipt_number = donation.receipt_number.clone();

        let new_donor = donor_id.is_some_and(|donor| {
            !state.donations.values().any(|d| {
                d.campaign_id == campaign_id
                    && d.donor_id == Some(donor)
                    && d.ledgered_at.is_some()
                    && d.id != donation_id
            })
        });

        let Some(campaign) = state.campaigns.get_mut(&campaign_id) else {
            return Err(StoreError::Backend(format!("no campaign {campaign_id}")));
        };
        let delta = campaign.ledger_totals().credit(amount_cents, new_donor);
        apply_delta(campaign, &delta);
        campaign.stats.last_donation_at = Some(now);
        let campaign = campaign.clone();

        if let Some(donation) = state.donations.get_mut(&donation_id) {
            donation.ledgered_at = Some(now);
            donation.updated_at = now;
        }

        Ok(Some(LedgerApplication {
            donation_id,
            donor_id,
            receipt_number,
            amount_cents,
            new_donor,
            auto_completed: delta.auto_completed,
            campaign,
        }))
    }

    async fn refund_donation(
        &self,
        id: DbId,
        refund: &RefundRequest,
    ) -> StoreResult<Option<RefundOutcome>> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        let now = Utc::now();

        let Some(donation) = state
            .donations
            .get_mut(&id)
            .filter(|d| d.payment_status == PaymentStatus::Completed)
        else {
            return Ok(None);
        };
        donation.payment_status = PaymentStatus::Refunded;
        donation.refund_amount_cents = Some(refund.amount_cents);
        donation.refund_reason = Some(refund.reason.clone());
        donation.refunded_by = Some(refund.refunded_by);
        donation.refunded_at = Some(now);
        donation.updated_at = now;
        let donation = donation.clone();

        let campaign = if donation.is_ledgered() {
            match state.campaigns.get_mut(&donation.campaign_id) {
                Some(campaign) => {
                    let delta = campaign
                        .ledger_totals()
                        .reverse(refund.amount_cents, donation.amount_cents);
                    apply_delta(campaign, &delta);
                    Some(campaign.clone())
                }
                None => None,
            }
        } else {
            None
        };

        Ok(Some(RefundOutcome { donation, campaign }))
    }

    async fn list_unledgered(&self, limit: i64) -> StoreResult<Vec<Donation>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        Ok(state
            .donations
            .values()
            .filter(|d| d.payment_status == PaymentStatus::Completed && d.ledgered_at.is_none())
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

impl TaskStore for MemoryStore {
    async fn insert_task(&self, created_by: DbId, input: &CreateTask) -> StoreResult<Task> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        if !state.campaigns.contains_key(&input.campaign_id) {
            return Err(StoreError::Backend(format!(
                "foreign key violation: campaign {}",
                input.campaign_id
            )));
        }
        let now = Utc::now();
        let task = Task {
            id: state.next_id(),
            campaign_id: input.campaign_id,
            task_type: input.task_type,
            title: input.title.trim().to_string(),
            description: input.description.clone().unwrap_or_default(),
            priority: input.priority.unwrap_or(0),
            status: TaskStatus::Pending,
            assigned_to: None,
            created_by,
            progress: 0,
            deadline: input.deadline,
            assigned_at: None,
            submitted_at: None,
            completed_at: None,
            review_decision: None,
            review_feedback: None,
            reviewed_by: None,
            reviewed_at: None,
            cancelled_at: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: DbId) -> StoreResult<Option<Task>> {
        tokio::task::yield_now().await;
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    async fn try_claim_task(&self, id: DbId, volunteer_id: DbId) -> StoreResult<Option<Task>> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        match state
            .tasks
            .get_mut(&id)
            .filter(|t| t.status == TaskStatus::Pending && t.assigned_to.is_none())
        {
            Some(task) => {
                let now = Utc::now();
                task.assigned_to = Some(volunteer_id);
                task.status = TaskStatus::Assigned;
                task.assigned_at = Some(now);
                task.updated_at = now;
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn record_task_progress(
        &self,
        id: DbId,
        write: &ProgressWrite,
    ) -> StoreResult<Option<(Task, TaskUpdate)>> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        let now = Utc::now();
        let Some(task) = state.tasks.get_mut(&id).filter(|t| {
            t.status == write.expected_status && t.assigned_to == Some(write.volunteer_id)
        }) else {
            return Ok(None);
        };
        task.status = write.next_status;
        task.progress = write.progress;
        if write.submits_for_review {
            task.submitted_at = Some(now);
        }
        task.updated_at = now;
        let task = task.clone();

        let update = TaskUpdate {
            id: state.next_id(),
            task_id: id,
            volunteer_id: write.volunteer_id,
            progress: write.progress,
            note: write.note.clone(),
            status_after: task.status,
            created_at: now,
        };
        state.task_updates.push(update.clone());
        Ok(Some((task, update)))
    }

    async fn review_task(&self, id: DbId, write: &ReviewWrite) -> StoreResult<Option<Task>> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        let now = Utc::now();
        match state
            .tasks
            .get_mut(&id)
            .filter(|t| t.status == TaskStatus::Review)
        {
            Some(task) => {
                task.status = write.decision.target_status();
                task.review_decision = Some(write.decision);
                task.review_feedback = write.feedback.clone();
                task.reviewed_by = Some(write.reviewer_id);
                task.reviewed_at = Some(now);
                match write.decision {
                    ReviewDecision::Approved => task.completed_at = Some(now),
                    ReviewDecision::Rejected => task.cancelled_at = Some(now),
                    ReviewDecision::NeedsRevision => {}
                }
                task.updated_at = now;
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn cancel_task(&self, id: DbId, write: &CancelWrite) -> StoreResult<Option<Task>> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        match state
            .tasks
            .get_mut(&id)
            .filter(|t| t.status == write.expected_status)
        {
            Some(task) => {
                let now = Utc::now();
                task.status = TaskStatus::Cancelled;
                task.cancelled_at = Some(now);
                task.cancel_reason = Some(write.reason.clone());
                task.updated_at = now;
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_task_updates(&self, task_id: DbId) -> StoreResult<Vec<TaskUpdate>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        Ok(state
            .task_updates
            .iter()
            .filter(|u| u.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn mark_overdue_tasks(&self) -> StoreResult<Vec<Task>> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        let now = Utc::now();
        let mut marked = Vec::new();
        for task in state.tasks.values_mut() {
            let past_deadline = task.deadline.is_some_and(|d| d < now);
            if task.status == TaskStatus::InProgress && past_deadline {
                task.status = TaskStatus::Overdue;
                task.updated_at = now;
                marked.push(task.clone());
            }
        }
        Ok(marked)
    }
}

// ---------------------------------------------------------------------------
// Audit and notifications
// ---------------------------------------------------------------------------

impl AuditStore for MemoryStore {
    async fn append_audit(&self, entry: &NewAuditLog) -> StoreResult<AuditLog> {
        tokio::task::yield_now().await;
        if self.faults.audit.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected audit failure".into()));
        }
        let changes = entry
            .changes
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut state = self.lock()?;
        let prev_hash = state.audit_logs.last().map(|l| l.integrity_hash.clone());
        let log = AuditLog {
            id: state.next_id(),
            action: entry.action,
            entity_kind: entry.entity.kind,
            entity_id: entry.entity.id,
            performed_by: entry.performed_by,
            actor_role: entry.actor_role,
            category: entry.category,
            severity: entry.severity,
            changes,
            details: entry.details.clone(),
            integrity_hash: compute_integrity_hash(prev_hash.as_deref(), &entry.canonical_json()),
            created_at: Utc::now(),
        };
        state.audit_logs.push(log.clone());
        Ok(log)
    }

    async fn query_audit(&self, params: &AuditQuery) -> StoreResult<AuditLogPage> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let (limit, offset) = params.page();
        let matching: Vec<&AuditLog> = state
            .audit_logs
            .iter()
            .rev()
            .filter(|l| params.matches(l))
            .collect();
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(AuditLogPage { items, total })
    }
}

impl NotificationStore for MemoryStore {
    async fn create_notification(&self, input: &NewNotification) -> StoreResult<Notification> {
        tokio::task::yield_now().await;
        if self.faults.notifications.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected notification failure".into()));
        }
        let mut state = self.lock()?;
        let now = Utc::now();
        let notification = Notification {
            id: state.next_id(),
            recipient_id: input.recipient_id,
            recipient_role: input.recipient_role,
            notification_type: input.notification_type,
            title: input.title.clone(),
            message: input.message.clone(),
            campaign_id: input.campaign_id,
            donation_id: input.donation_id,
            task_id: input.task_id,
            is_read: false,
            read_at: None,
            expires_at: expires_at(now),
            created_at: now,
        };
        state.notifications.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let now = Utc::now();
        Ok(state
            .notifications
            .values()
            .rev()
            .filter(|n| n.recipient_id == user_id && n.expires_at > now)
            .filter(|n| !unread_only || !n.is_read)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        match state
            .notifications
            .get_mut(&id)
            .filter(|n| n.recipient_id == user_id)
        {
            Some(notification) => {
                notification.is_read = true;
                notification.read_at.get_or_insert_with(Utc::now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: DbId) -> StoreResult<u64> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        let now = Utc::now();
        let mut count = 0;
        for n in state
            .notifications
            .values_mut()
            .filter(|n| n.recipient_id == user_id && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(now);
            count += 1;
        }
        Ok(count)
    }

    async fn unread_notification_count(&self, user_id: DbId) -> StoreResult<i64> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let now = Utc::now();
        Ok(state
            .notifications
            .values()
            .filter(|n| n.recipient_id == user_id && !n.is_read && n.expires_at > now)
            .count() as i64)
    }

    async fn purge_expired_notifications(&self) -> StoreResult<u64> {
        tokio::task::yield_now().await;
        let mut state = self.lock()?;
        let now = Utc::now();
        let before = state.notifications.len();
        state.notifications.retain(|_, n| n.expires_at > now);
        Ok((before - state.notifications.len()) as u64)
    }
}

impl FundingStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}
