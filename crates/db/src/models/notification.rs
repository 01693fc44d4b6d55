//! Notification entity models and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use fundbridge_core::notification::NotificationType;
use fundbridge_core::roles::Role;
use fundbridge_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: DbId,
    pub recipient_role: Role,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub campaign_id: Option<DbId>,
    pub donation_id: Option<DbId>,
    pub task_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for creating a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: DbId,
    pub recipient_role: Role,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub campaign_id: Option<DbId>,
    pub donation_id: Option<DbId>,
    pub task_id: Option<DbId>,
}
