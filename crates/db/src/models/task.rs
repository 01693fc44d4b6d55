//! Task entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fundbridge_core::task::{ReviewDecision, TaskStatus, TaskType};
use fundbridge_core::types::{DbId, Timestamp};

/// A row from the `tasks` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub campaign_id: DbId,
    pub task_type: TaskType,
    pub title: String,
    pub description: String,
    pub priority: i16,
    pub status: TaskStatus,
    pub assigned_to: Option<DbId>,
    pub created_by: DbId,
    pub progress: i16,
    pub deadline: Option<Timestamp>,
    pub assigned_at: Option<Timestamp>,
    pub submitted_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub review_decision: Option<ReviewDecision>,
    pub review_feedback: Option<String>,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancel_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `task_updates` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TaskUpdate {
    pub id: DbId,
    pub task_id: DbId,
    pub volunteer_id: DbId,
    pub progress: i16,
    pub note: String,
    pub status_after: TaskStatus,
    pub created_at: Timestamp,
}

/// DTO for creating a task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub campaign_id: DbId,
    pub task_type: TaskType,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<i16>,
    pub deadline: Option<Timestamp>,
}

/// Conditional progress write: applies only if the task is still in
/// `expected_status` and assigned to `volunteer_id`.
#[derive(Debug, Clone)]
pub struct ProgressWrite {
    pub volunteer_id: DbId,
    pub expected_status: TaskStatus,
    pub next_status: TaskStatus,
    pub progress: i16,
    pub submits_for_review: bool,
    pub note: String,
}

/// Conditional review write from `review`.
#[derive(Debug, Clone)]
pub struct ReviewWrite {
    pub reviewer_id: DbId,
    pub decision: ReviewDecision,
    pub feedback: Option<String>,
}

/// Conditional cancel write.
#[derive(Debug, Clone)]
pub struct CancelWrite {
    pub expected_status: TaskStatus,
    pub reason: String,
}
