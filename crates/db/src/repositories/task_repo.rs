//! Repository for the `tasks` and `task_updates` tables.
//!
//! Every state change is a conditional UPDATE guarded on the status (and,
//! where relevant, the assignee) the caller validated against. A `None`
//! result means another writer got there first.

use sqlx::PgPool;
use fundbridge_core::task::{ReviewDecision, TaskStatus};
use fundbridge_core::types::DbId;

use crate::models::task::{CancelWrite, CreateTask, ProgressWrite, ReviewWrite, Task, TaskUpdate};

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, campaign_id, task_type, title, description, priority, status, \
    assigned_to, created_by, progress, deadline, assigned_at, submitted_at, \
    completed_at, review_decision, review_feedback, reviewed_by, reviewed_at, \
    cancelled_at, cancel_reason, created_at, updated_at";

/// Column list for `task_updates` queries.
const UPDATE_COLUMNS: &str =
    "id, task_id, volunteer_id, progress, note, status_after, created_at";

/// Provides task lifecycle operations.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new pending, unassigned task.
    pub async fn create(
        pool: &PgPool,
        created_by: DbId,
        input: &CreateTask,
    ) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks \
                (campaign_id, task_type, title, description, priority, deadline, created_by, status) \
             VALUES ($1, $2, $3, COALESCE($4, ''), COALESCE($5, 0), $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(input.campaign_id)
            .bind(input.task_type)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(input.priority)
            .bind(input.deadline)
            .bind(created_by)
            .bind(TaskStatus::Pending)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim a pending, unassigned task for a volunteer.
    ///
    /// Test-and-set on `(status, assigned_to)`: of any number of concurrent
    /// claims, exactly one matches the WHERE clause.
    pub async fn try_claim(
        pool: &PgPool,
        id: DbId,
        volunteer_id: DbId,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET \
                 assigned_to = $2, status = $3, assigned_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $4 AND assigned_to IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(volunteer_id)
            .bind(TaskStatus::Assigned)
            .bind(TaskStatus::Pending)
            .fetch_optional(pool)
            .await
    }

    /// Record a volunteer progress update and append it to the history.
    pub async fn record_progress(
        pool: &PgPool,
        id: DbId,
        write: &ProgressWrite,
    ) -> Result<Option<(Task, TaskUpdate)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE tasks SET \
                 status = $4, \
                 progress = $5, \
                 submitted_at = CASE WHEN $6 THEN NOW() ELSE submitted_at END, \
                 updated_at = NOW() \
             WHERE id = $1 AND assigned_to = $2 AND status = $3 \
             RETURNING {COLUMNS}"
        );
        let Some(task) = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(write.volunteer_id)
            .bind(write.expected_status)
            .bind(write.next_status)
            .bind(write.progress)
            .bind(write.submits_for_review)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO task_updates (task_id, volunteer_id, progress, note, status_after) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {UPDATE_COLUMNS}"
        );
        let update = sqlx::query_as::<_, TaskUpdate>(&query)
            .bind(id)
            .bind(write.volunteer_id)
            .bind(write.progress)
            .bind(&write.note)
            .bind(task.status)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((task, update)))
    }

    /// Apply an administrator review to a task in `review`.
    pub async fn review(
        pool: &PgPool,
        id: DbId,
        write: &ReviewWrite,
    ) -> Result<Option<Task>, sqlx::Error> {
        let target = write.decision.target_status();
        let query = format!(
            "UPDATE tasks SET \
                 status = $2, \
                 review_decision = $3, \
                 review_feedback = $4, \
                 reviewed_by = $5, \
                 reviewed_at = NOW(), \
                 completed_at = CASE WHEN $6 THEN NOW() ELSE completed_at END, \
                 cancelled_at = CASE WHEN $7 THEN NOW() ELSE cancelled_at END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status = $8 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(target)
            .bind(write.decision)
            .bind(&write.feedback)
            .bind(write.reviewer_id)
            .bind(write.decision == ReviewDecision::Approved)
            .bind(write.decision == ReviewDecision::Rejected)
            .bind(TaskStatus::Review)
            .fetch_optional(pool)
            .await
    }

    /// Cancel a task still in `expected_status`.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        write: &CancelWrite,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET \
                 status = $2, cancelled_at = NOW(), cancel_reason = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(TaskStatus::Cancelled)
            .bind(&write.reason)
            .bind(write.expected_status)
            .fetch_optional(pool)
            .await
    }

    /// Progress history for a task, oldest first.
    pub async fn list_updates(pool: &PgPool, task_id: DbId) -> Result<Vec<TaskUpdate>, sqlx::Error> {
        let query = format!(
            "SELECT {UPDATE_COLUMNS} FROM task_updates WHERE task_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, TaskUpdate>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    /// Persist `overdue` for every in-progress task past its deadline.
    pub async fn mark_overdue(pool: &PgPool) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET status = $1, updated_at = NOW() \
             WHERE status = $2 AND deadline IS NOT NULL AND deadline < NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(TaskStatus::Overdue)
            .bind(TaskStatus::InProgress)
            .fetch_all(pool)
            .await
    }
}
