//! Task Assignment Engine: the claim/work/review lifecycle of volunteer tasks.
//!
//! Claims are a single test-and-set in the store. Every other transition is
//! an optimistic conditional write against the status this engine validated,
//! so a concurrent change surfaces as `Conflict` instead of a lost update.

use chrono::Utc;
use fundbridge_core::audit::{AuditAction, EntityRef};
use fundbridge_core::error::CoreError;
use fundbridge_core::notification::NotificationType;
use fundbridge_core::roles::{Actor, Role};
use fundbridge_core::task::{
    effective_status, plan_progress_update, validate_note, validate_review, validate_task_title,
    ReviewDecision, TaskStatus,
};
use fundbridge_core::types::DbId;
use fundbridge_db::models::task::{
    CancelWrite, CreateTask, ProgressWrite, ReviewWrite, Task, TaskUpdate,
};
use serde::Deserialize;

use crate::emitter::{audit_entry, notification, Emitter};
use crate::store::FundingStore;

/// A volunteer's progress report.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub progress: i16,
    /// Optional explicit request: `in_progress` or `completed`.
    pub status: Option<TaskStatus>,
    pub note: Option<String>,
}

/// Present the derived overdue status on reads.
fn present(mut task: Task) -> Task {
    task.status = effective_status(task.status, task.deadline, Utc::now());
    task
}

fn task_notification(
    task: &Task,
    recipient_id: DbId,
    recipient_role: Role,
    kind: NotificationType,
    title: &str,
    message: String,
) -> fundbridge_db::models::notification::NewNotification {
    let mut note = notification(recipient_id, recipient_role, kind, title, message);
    note.task_id = Some(task.id);
    note.campaign_id = Some(task.campaign_id);
    note
}

#[derive(Clone)]
pub struct TaskEngine<S> {
    store: S,
    emitter: Emitter<S>,
}

impl<S: FundingStore> TaskEngine<S> {
    pub fn new(store: S, emitter: Emitter<S>) -> Self {
        Self { store, emitter }
    }

    /// Create a pending, unassigned task. Administrators and the campaign's
    /// creator may create tasks.
    pub async fn create_task(&self, actor: &Actor, input: CreateTask) -> Result<Task, CoreError> {
        validate_task_title(&input.title)?;
        if let Some(description) = &input.description {
            validate_note(description)?;
        }
        if input.deadline.is_some_and(|d| d <= Utc::now()) {
            return Err(CoreError::Validation("Task deadline must be in the future".into()));
        }

        let campaign = self
            .store
            .find_campaign(input.campaign_id)
            .await?
            .ok_or_else(|| CoreError::not_found("campaign", input.campaign_id))?;
        if !actor.is_admin() && campaign.creator_id != actor.user_id {
            return Err(CoreError::Forbidden(
                "Only administrators and the campaign creator can create tasks".into(),
            ));
        }

        let task = self.store.insert_task(actor.user_id, &input).await?;
        tracing::info!(task_id = task.id, campaign_id = task.campaign_id, "Task created");

        let mut entry = audit_entry(AuditAction::TaskCreated, EntityRef::task(task.id), Some(actor));
        entry.details = Some(serde_json::json!({
            "campaign_id": task.campaign_id,
            "task_type": task.task_type,
            "deadline": task.deadline,
        }));
        self.emitter.record(entry).await;

        Ok(task)
    }

    pub async fn get_task(&self, task_id: DbId) -> Result<Task, CoreError> {
        self.store
            .find_task(task_id)
            .await?
            .map(present)
            .ok_or_else(|| CoreError::not_found("task", task_id))
    }

    /// Claim a pending task for a volunteer.
    ///
    /// Exactly one of any number of concurrent claims succeeds; the others
    /// get `Conflict`. Re-claiming one's own active task is a no-op.
    pub async fn claim_task(&self, task_id: DbId, volunteer_id: DbId) -> Result<Task, CoreError> {
        if let Some(task) = self.store.try_claim_task(task_id, volunteer_id).await? {
            tracing::info!(task_id, volunteer_id, "Task claimed");

            let note = task_notification(
                &task,
                volunteer_id,
                Role::Volunteer,
                NotificationType::TaskAssigned,
                "Task assigned",
                format!("You are now assigned to '{}'.", task.title),
            );
            self.emitter.notify(note).await;

            let actor = Actor::new(volunteer_id, Role::Volunteer);
            let entry = audit_entry(AuditAction::TaskClaimed, EntityRef::task(task_id), Some(&actor));
            self.emitter.record(entry).await;

            return Ok(present(task));
        }

        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("task", task_id))?;

        match task.assigned_to {
            Some(owner) if owner == volunteer_id && task.status.is_claimed_work() => {
                tracing::debug!(task_id, volunteer_id, "Idempotent re-claim");
                Ok(present(task))
            }
            Some(owner) if owner != volunteer_id => {
                tracing::debug!(task_id, volunteer_id, owner, "Claim lost to another volunteer");
                Err(CoreError::Conflict(format!(
                    "Task {task_id} is already assigned"
                )))
            }
            _ => Err(CoreError::InvalidState(format!(
                "Task {task_id} is {} and cannot be claimed",
                task.status
            ))),
        }
    }

    /// Record progress from the assigned volunteer.
    ///
    /// Full progress or an explicit completion request submits the task for
    /// review; only an administrator's approval completes it.
    pub async fn update_task_progress(
        &self,
        task_id: DbId,
        volunteer_id: DbId,
        update: ProgressUpdate,
    ) -> Result<Task, CoreError> {
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("task", task_id))?;

        if task.assigned_to != Some(volunteer_id) {
            return Err(CoreError::Forbidden(
                "Only the assigned volunteer can update this task".into(),
            ));
        }
        let note = update.note.unwrap_or_default();
        validate_note(&note)?;

        let current = effective_status(task.status, task.deadline, Utc::now());
        let plan = plan_progress_update(current, update.progress, update.status)?;

        let write = ProgressWrite {
            volunteer_id,
            expected_status: task.status,
            next_status: plan.next_status,
            progress: update.progress,
            submits_for_review: plan.submits_for_review,
            note,
        };
        let (updated, _) = self
            .store
            .record_task_progress(task_id, &write)
            .await?
            .ok_or_else(|| CoreError::Conflict(format!("Task {task_id} changed concurrently")))?;

        tracing::info!(
            task_id,
            volunteer_id,
            progress = updated.progress,
            status = %updated.status,
            "Task progress recorded",
        );

        if plan.submits_for_review {
            let note = task_notification(
                &updated,
                updated.created_by,
                Role::Admin,
                NotificationType::TaskReviewRequested,
                "Task ready for review",
                format!("'{}' was submitted for review.", updated.title),
            );
            self.emitter.notify(note).await;

            let actor = Actor::new(volunteer_id, Role::Volunteer);
            let entry =
                audit_entry(AuditAction::TaskSubmitted, EntityRef::task(task_id), Some(&actor));
            self.emitter.record(entry).await;
        }

        Ok(present(updated))
    }

    /// Administrator review of a task in `review`.
    pub async fn review_task(
        &self,
        task_id: DbId,
        admin: &Actor,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> Result<Task, CoreError> {
        admin.require_admin()?;
        if let Some(feedback) = &feedback {
            validate_note(feedback)?;
        }
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("task", task_id))?;
        validate_review(task.status)?;

        let write = ReviewWrite {
            reviewer_id: admin.user_id,
            decision,
            feedback,
        };
        let reviewed = self
            .store
            .review_task(task_id, &write)
            .await?
            .ok_or_else(|| CoreError::Conflict(format!("Task {task_id} changed concurrently")))?;

        tracing::info!(task_id, decision = decision.as_str(), "Task reviewed");

        if let Some(assignee) = reviewed.assigned_to {
            let (kind, title) = match decision {
                ReviewDecision::Approved => (NotificationType::TaskApproved, "Task approved"),
                ReviewDecision::NeedsRevision => {
                    (NotificationType::TaskRevisionRequested, "Task needs revision")
                }
                ReviewDecision::Rejected => (NotificationType::TaskRejected, "Task rejected"),
            };
            let message = match &write.feedback {
                Some(feedback) => format!("'{}': {feedback}", reviewed.title),
                None => format!("'{}' was reviewed.", reviewed.title),
            };
            let note = task_notification(&reviewed, assignee, Role::Volunteer, kind, title, message);
            self.emitter.notify(note).await;
        }

        let mut entry = audit_entry(AuditAction::TaskReviewed, EntityRef::task(task_id), Some(admin));
        entry.details = Some(serde_json::json!({
            "decision": decision,
            "feedback": write.feedback,
            "status": reviewed.status,
        }));
        self.emitter.record(entry).await;

        Ok(present(reviewed))
    }

    /// Cancel a task that has not reached review or a terminal state.
    pub async fn cancel_task(
        &self,
        task_id: DbId,
        admin: &Actor,
        reason: &str,
    ) -> Result<Task, CoreError> {
        admin.require_admin()?;
        validate_note(reason)?;
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("task", task_id))?;
        if !task.status.is_cancellable() {
            return Err(CoreError::InvalidState(format!(
                "Task {task_id} is {} and cannot be cancelled",
                task.status
            )));
        }

        let write = CancelWrite {
            expected_status: task.status,
            reason: reason.trim().to_string(),
        };
        let cancelled = self
            .store
            .cancel_task(task_id, &write)
            .await?
            .ok_or_else(|| CoreError::Conflict(format!("Task {task_id} changed concurrently")))?;

        tracing::info!(task_id, "Task cancelled");

        if let Some(assignee) = cancelled.assigned_to {
            let note = task_notification(
                &cancelled,
                assignee,
                Role::Volunteer,
                NotificationType::TaskCancelled,
                "Task cancelled",
                format!("'{}' was cancelled.", cancelled.title),
            );
            self.emitter.notify(note).await;
        }

        let mut entry =
            audit_entry(AuditAction::TaskCancelled, EntityRef::task(task_id), Some(admin));
        entry.details = Some(serde_json::json!({
            "previous_status": task.status,
            "reason": write.reason,
        }));
        self.emitter.record(entry).await;

        Ok(cancelled)
    }

    pub async fn list_task_updates(&self, task_id: DbId) -> Result<Vec<TaskUpdate>, CoreError> {
        if self.store.find_task(task_id).await?.is_none() {
            return Err(CoreError::not_found("task", task_id));
        }
        Ok(self.store.list_task_updates(task_id).await?)
    }

    /// Persist `overdue` for in-progress tasks past their deadline.
    pub async fn sweep_overdue(&self) -> Result<usize, CoreError> {
        let marked = self.store.mark_overdue_tasks().await?;
        if !marked.is_empty() {
            tracing::info!(
                count = marked.len(),
                task_ids = ?marked.iter().map(|t| t.id).collect::<Vec<_>>(),
                "Marked tasks overdue",
            );
        }
        Ok(marked.len())
    }
}
