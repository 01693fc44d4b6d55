//! Volunteer task lifecycle: statuses, review decisions, and the pure
//! transition rules the task engine applies.
//!
//! ```text
//! pending -> assigned -> in_progress -> review -> completed
//!    |           |            |    \        \-> in_progress (needs_revision)
//!    |           |            |     \-> overdue -> review
//!    +-----------+------------+--> cancelled  (review: rejected -> cancelled)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum task title length.
pub const MAX_TASK_TITLE_LENGTH: usize = 200;

/// Maximum length of a progress note or review feedback.
pub const MAX_NOTE_LENGTH: usize = 10_000;

/// Full progress; submitting it requests review.
pub const PROGRESS_COMPLETE: i16 = 100;

/// Kind of volunteer work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum TaskType {
    Verification,
    FieldVisit,
    Documentation,
    ContentReview,
    Investigation,
    FollowUp,
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Review,
    Completed,
    Cancelled,
    Overdue,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Overdue => "overdue",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses in which the assignee may re-claim without error.
    pub fn is_claimed_work(self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress | Self::Overdue)
    }

    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Assigned | Self::InProgress | Self::Overdue
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrator review outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    NeedsRevision,
    Rejected,
}

impl ReviewDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::NeedsRevision => "needs_revision",
            Self::Rejected => "rejected",
        }
    }

    /// Status the task moves to after this decision.
    pub fn target_status(self) -> TaskStatus {
        match self {
            Self::Approved => TaskStatus::Completed,
            Self::NeedsRevision => TaskStatus::InProgress,
            Self::Rejected => TaskStatus::Cancelled,
        }
    }
}

/// Overdue derivation: an in-progress task past its deadline reads as overdue.
pub fn effective_status(
    status: TaskStatus,
    deadline: Option<Timestamp>,
    now: Timestamp,
) -> TaskStatus {
    match (status, deadline) {
        (TaskStatus::InProgress, Some(deadline)) if now > deadline => TaskStatus::Overdue,
        _ => status,
    }
}

pub fn validate_progress(progress: i16) -> Result<(), CoreError> {
    if (0..=PROGRESS_COMPLETE).contains(&progress) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Progress must be between 0 and {PROGRESS_COMPLETE}, got {progress}"
        )))
    }
}

pub fn validate_task_title(title: &str) -> Result<(), CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Task title must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Task title exceeds {MAX_TASK_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_note(note: &str) -> Result<(), CoreError> {
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Note exceeds {MAX_NOTE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Where a progress update takes the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPlan {
    pub next_status: TaskStatus,
    /// `true` when the update submits the work for review.
    pub submits_for_review: bool,
}

/// Decide the next status for a volunteer progress update.
///
/// A volunteer cannot complete a task; full progress or an explicit
/// completion request moves it to `review`. `requested` may only be
/// `in_progress` or `completed`.
pub fn plan_progress_update(
    current: TaskStatus,
    progress: i16,
    requested: Option<TaskStatus>,
) -> Result<ProgressPlan, CoreError> {
    validate_progress(progress)?;

    if current.is_terminal() {
        return Err(CoreError::InvalidState(format!(
            "Task is already {current}"
        )));
    }
    if current == TaskStatus::Pending {
        return Err(CoreError::InvalidState(
            "Task must be claimed before reporting progress".into(),
        ));
    }
    if let Some(req) = requested {
        if !matches!(req, TaskStatus::InProgress | TaskStatus::Completed) {
            return Err(CoreError::Validation(format!(
                "Volunteers may only request 'in_progress' or 'completed', got '{req}'"
            )));
        }
    }

    let wants_completion =
        progress == PROGRESS_COMPLETE || requested == Some(TaskStatus::Completed);

    let plan = match current {
        TaskStatus::Review => ProgressPlan {
            next_status: TaskStatus::Review,
            submits_for_review: false,
        },
        _ if wants_completion => ProgressPlan {
            next_status: TaskStatus::Review,
            submits_for_review: true,
        },
        TaskStatus::Overdue => ProgressPlan {
            next_status: TaskStatus::Overdue,
            submits_for_review: false,
        },
        _ => ProgressPlan {
            next_status: TaskStatus::InProgress,
            submits_for_review: false,
        },
    };
    Ok(plan)
}

/// Validate that a review can happen from `current`.
pub fn validate_review(current: TaskStatus) -> Result<(), CoreError> {
    if current == TaskStatus::Review {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Only tasks in review can be reviewed; task is {current}"
        )))
    }
}
