//! Audit trail vocabulary, integrity chaining, and redaction.
//!
//! Audit entries are append-only. Each carries a SHA-256 hash chained over
//! the previous entry so edits or deletions in storage are detectable.

use serde::{Deserialize, Serialize};

use crate::hashing;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Actions, categories, severities
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum AuditAction {
    CampaignCreated,
    CampaignUpdated,
    CampaignDeleted,
    CampaignCompleted,
    DonationRecorded,
    DonationRefunded,
    LedgerReconciled,
    TaskCreated,
    TaskClaimed,
    TaskSubmitted,
    TaskReviewed,
    TaskCancelled,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CampaignCreated => "campaign_created",
            Self::CampaignUpdated => "campaign_updated",
            Self::CampaignDeleted => "campaign_deleted",
            Self::CampaignCompleted => "campaign_completed",
            Self::DonationRecorded => "donation_recorded",
            Self::DonationRefunded => "donation_refunded",
            Self::LedgerReconciled => "ledger_reconciled",
            Self::TaskCreated => "task_created",
            Self::TaskClaimed => "task_claimed",
            Self::TaskSubmitted => "task_submitted",
            Self::TaskReviewed => "task_reviewed",
            Self::TaskCancelled => "task_cancelled",
        }
    }

    /// Category used for filtering and retention grouping.
    pub fn category(self) -> AuditCategory {
        match self {
            Self::DonationRecorded | Self::DonationRefunded | Self::LedgerReconciled => {
                AuditCategory::Financial
            }
            Self::CampaignCreated
            | Self::CampaignUpdated
            | Self::CampaignDeleted => AuditCategory::Moderation,
            Self::CampaignCompleted => AuditCategory::System,
            Self::TaskCreated
            | Self::TaskClaimed
            | Self::TaskSubmitted
            | Self::TaskReviewed
            | Self::TaskCancelled => AuditCategory::Workflow,
        }
    }

    /// Default severity; callers may raise it.
    pub fn default_severity(self) -> AuditSeverity {
        match self {
            Self::DonationRefunded | Self::CampaignDeleted | Self::LedgerReconciled => {
                AuditSeverity::Warning
            }
            _ => AuditSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum AuditCategory {
    Financial,
    Moderation,
    Workflow,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

// ---------------------------------------------------------------------------
// Entity references
// ---------------------------------------------------------------------------

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum EntityKind {
    Campaign,
    User,
    Task,
    Donation,
}

/// Typed polymorphic reference: `{kind, id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: DbId,
}

impl EntityRef {
    pub fn campaign(id: DbId) -> Self {
        Self { kind: EntityKind::Campaign, id }
    }

    pub fn donation(id: DbId) -> Self {
        Self { kind: EntityKind::Donation, id }
    }

    pub fn task(id: DbId) -> Self {
        Self { kind: EntityKind::Task, id }
    }

    pub fn user(id: DbId) -> Self {
        Self { kind: EntityKind::User, id }
    }
}

// ---------------------------------------------------------------------------
// Change sets
// ---------------------------------------------------------------------------

/// Top-level keys whose values differ between `before` and `after`.
///
/// Keys present on only one side count as changed. Output is sorted.
pub fn changed_fields(before: &serde_json::Value, after: &serde_json::Value) -> Vec<String> {
    let empty = serde_json::Map::new();
    let b = before.as_object().unwrap_or(&empty);
    let a = after.as_object().unwrap_or(&empty);

    let mut fields: Vec<String> = b
        .keys()
        .chain(a.keys())
        .filter(|k| b.get(*k) != a.get(*k))
        .cloned()
        .collect();
    fields.sort();
    fields.dedup();
    fields
}

// ---------------------------------------------------------------------------
// Integrity hash computation
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in the hash chain.
const CHAIN_SEED: &str = "FUNDBRIDGE_AUDIT_CHAIN_V1";

/// Compute the integrity hash for an entry given the previous entry's hash.
///
/// `entry_data` is the canonical JSON of the entry's content.
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    hashing::sha256_hex(format!("{prev}|{entry_data}").as_bytes())
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Key fragments redacted from audit details before storage.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "authorization",
    "card_number",
    "cvv",
    "account_number",
];

/// Replace the value of any sensitive key with `"[REDACTED]"`, recursively.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(key, val)| {
                    let lower = key.to_lowercase();
                    if SENSITIVE_FIELDS.iter().any(|f| lower.contains(f)) {
                        (key.clone(), serde_json::Value::String("[REDACTED]".into()))
                    } else {
                        (key.clone(), redact_sensitive_fields(val))
                    }
                })
                .collect();
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn refunds_are_financial_warnings() {
        assert_eq!(AuditAction::DonationRefunded.category(), AuditCategory::Financial);
        assert_eq!(
            AuditAction::DonationRefunded.default_severity(),
            AuditSeverity::Warning
        );
    }

    #[test]
    fn task_actions_are_workflow() {
        assert_eq!(AuditAction::TaskReviewed.category(), AuditCategory::Workflow);
        assert_eq!(AuditAction::TaskClaimed.default_severity(), AuditSeverity::Info);
    }

    #[test]
    fn campaign_edits_are_moderation() {
        assert_eq!(AuditAction::CampaignUpdated.category(), AuditCategory::Moderation);
    }

    #[test]
    fn changed_fields_lists_differences_only() {
        let before = json!({"title": "A", "status": "live", "goal_cents": 100});
        let after = json!({"title": "B", "status": "live", "goal_cents": 200});
        assert_eq!(changed_fields(&before, &after), vec!["goal_cents", "title"]);
    }

    #[test]
    fn changed_fields_counts_one_sided_keys() {
        let before = json!({"title": "A"});
        let after = json!({"title": "A", "description": "new"});
        assert_eq!(changed_fields(&before, &after), vec!["description"]);
    }

    #[test]
    fn first_entry_uses_seed() {
        let hash = compute_integrity_hash(None, "entry");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_integrity_hash(Some(CHAIN_SEED), "entry"));
    }

    #[test]
    fn chain_depends_on_previous_hash() {
        let first = compute_integrity_hash(None, "entry_1");
        let second = compute_integrity_hash(Some(&first), "entry_2");
        let forged = compute_integrity_hash(Some("tampered"), "entry_2");
        assert_ne!(second, forged);
    }

    #[test]
    fn redacts_nested_sensitive_keys() {
        let input = json!({
            "reason": "chargeback",
            "gateway": {"api_key": "sk_live_x", "card_number": "4242"},
            "items": [{"token": "t"}]
        });
        let out = redact_sensitive_fields(&input);
        assert_eq!(out["reason"], "chargeback");
        assert_eq!(out["gateway"]["api_key"], "[REDACTED]");
        assert_eq!(out["gateway"]["card_number"], "[REDACTED]");
        assert_eq!(out["items"][0]["token"], "[REDACTED]");
    }
}
