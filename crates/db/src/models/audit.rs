//! Audit log entity models and DTOs.
//!
//! Audit entries have no `updated_at`: they are never mutated.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fundbridge_core::audit::{AuditAction, AuditCategory, AuditSeverity, EntityKind, EntityRef};
use fundbridge_core::roles::Role;
use fundbridge_core::types::{DbId, Timestamp};

/// Maximum rows returned by one audit query.
pub const MAX_AUDIT_PAGE_SIZE: i64 = 500;

/// Default audit page size.
pub const DEFAULT_AUDIT_PAGE_SIZE: i64 = 50;

/// A row from the `audit_logs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub action: AuditAction,
    pub entity_kind: EntityKind,
    pub entity_id: DbId,
    pub performed_by: Option<DbId>,
    pub actor_role: Role,
    pub category: AuditCategory,
    pub severity: AuditSeverity,
    pub changes: Option<serde_json::Value>,
    pub details: Option<serde_json::Value>,
    pub integrity_hash: String,
    pub created_at: Timestamp,
}

impl AuditLog {
    pub fn entity(&self) -> EntityRef {
        EntityRef {
            kind: self.entity_kind,
            id: self.entity_id,
        }
    }
}

/// `changes` payload for update actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditChanges {
    pub before: serde_json::Value,
    pub after: serde_json::Value,
    pub fields: Vec<String>,
}

/// DTO for appending an audit entry. The hash is computed on insert.
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub action: AuditAction,
    pub entity: EntityRef,
    pub performed_by: Option<DbId>,
    pub actor_role: Role,
    pub category: AuditCategory,
    pub severity: AuditSeverity,
    pub changes: Option<AuditChanges>,
    pub details: Option<serde_json::Value>,
}

impl NewAuditLog {
    /// Canonical content hashed into the integrity chain.
    pub fn canonical_json(&self) -> String {
        serde_json::json!({
            "action": self.action,
            "entity": self.entity,
            "performed_by": self.performed_by,
            "actor_role": self.actor_role,
            "category": self.category,
            "severity": self.severity,
            "changes": self.changes,
            "details": self.details,
        })
        .to_string()
    }
}

/// Filter parameters for querying audit logs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub entity_kind: Option<EntityKind>,
    pub entity_id: Option<DbId>,
    pub action: Option<AuditAction>,
    pub performed_by: Option<DbId>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditQuery {
    /// `(limit, offset)` clamped to the allowed window.
    pub fn page(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_AUDIT_PAGE_SIZE)
            .clamp(1, MAX_AUDIT_PAGE_SIZE);
        (limit, self.offset.unwrap_or(0).max(0))
    }

    /// In-process filter equivalent to the SQL WHERE clause.
    pub fn matches(&self, log: &AuditLog) -> bool {
        self.entity_kind.is_none_or(|k| log.entity_kind == k)
            && self.entity_id.is_none_or(|id| log.entity_id == id)
            && self.action.is_none_or(|a| log.action == a)
            && self.performed_by.is_none_or(|p| log.performed_by == Some(p))
            && self.from.is_none_or(|from| log.created_at >= from)
            && self.to.is_none_or(|to| log.created_at <= to)
    }
}

/// Paginated response for audit log queries.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogPage {
    pub items: Vec<AuditLog>,
    pub total: i64,
}
