//! Repository for the `audit_logs` table.

use sqlx::PgPool;
use fundbridge_core::audit::compute_integrity_hash;
use fundbridge_core::types::{DbId, Timestamp};

use crate::models::audit::{AuditLog, AuditLogPage, AuditQuery, NewAuditLog};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str = "\
    id, action, entity_kind, entity_id, performed_by, actor_role, category, \
    severity, changes, details, integrity_hash, created_at";

/// Advisory lock key serialising appends to the hash chain.
const CHAIN_LOCK_KEY: i64 = 0x6175_6469_745f_6c67;

// ---------------------------------------------------------------------------
// AuditLogRepo
// ---------------------------------------------------------------------------

/// Provides append and query operations for audit logs.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append an entry, chaining its integrity hash onto the latest entry.
    ///
    /// A transaction-scoped advisory lock keeps concurrent appends from
    /// forking the chain.
    pub async fn append(pool: &PgPool, entry: &NewAuditLog) -> Result<AuditLog, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CHAIN_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let prev_hash: Option<String> = sqlx::query_scalar(
            "SELECT integrity_hash FROM audit_logs ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let hash = compute_integrity_hash(prev_hash.as_deref(), &entry.canonical_json());
        let changes = entry
            .changes
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let query = format!(
            "INSERT INTO audit_logs \
                (action, entity_kind, entity_id, performed_by, actor_role, category, \
                 severity, changes, details, integrity_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        let log = sqlx::query_as::<_, AuditLog>(&query)
            .bind(entry.action)
            .bind(entry.entity.kind)
            .bind(entry.entity.id)
            .bind(entry.performed_by)
            .bind(entry.actor_role)
            .bind(entry.category)
            .bind(entry.severity)
            .bind(changes)
            .bind(&entry.details)
            .bind(hash)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(log)
    }

    /// Query audit logs with filtering and pagination, newest first.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<AuditLogPage, sqlx::Error> {
        let (where_clause, bind_values, next_idx) = build_audit_filter(params);
        let (limit, offset) = params.page();

        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${next_idx} OFFSET ${}",
            next_idx + 1
        );
        let mut q = sqlx::query_as::<_, AuditLog>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(*v),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        let items = q.bind(limit).bind(offset).fetch_all(pool).await?;

        let count_query = format!("SELECT COUNT(*) FROM audit_logs {where_clause}");
        let mut cq = sqlx::query_scalar::<_, i64>(&count_query);
        for val in &bind_values {
            cq = match val {
                BindValue::BigInt(v) => cq.bind(*v),
                BindValue::Text(v) => cq.bind(*v),
                BindValue::Timestamp(v) => cq.bind(*v),
            };
        }
        let total = cq.fetch_one(pool).await?;

        Ok(AuditLogPage { items, total })
    }
}

// ---------------------------------------------------------------------------
// Dynamic filter helpers
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built audit queries.
enum BindValue {
    BigInt(DbId),
    Text(&'static str),
    Timestamp(Timestamp),
}

/// Build a WHERE clause and bind values from `AuditQuery` filter parameters.
///
/// Returns `(where_clause, bind_values, next_bind_index)`. The clause is
/// empty if no filters are active, or starts with `WHERE `.
fn build_audit_filter(params: &AuditQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_values: Vec<BindValue> = Vec::new();
    let mut bind_idx = 1u32;

    let mut push = |column: &str, op: &str, value: BindValue| {
        conditions.push(format!("{column} {op} ${bind_idx}"));
        bind_values.push(value);
        bind_idx += 1;
    };

    if let Some(kind) = params.entity_kind {
        push("entity_kind", "=", BindValue::Text(entity_kind_str(kind)));
    }
    if let Some(entity_id) = params.entity_id {
        push("entity_id", "=", BindValue::BigInt(entity_id));
    }
    if let Some(action) = params.action {
        push("action", "=", BindValue::Text(action.as_str()));
    }
    if let Some(performed_by) = params.performed_by {
        push("performed_by", "=", BindValue::BigInt(performed_by));
    }
    if let Some(from) = params.from {
        push("created_at", ">=", BindValue::Timestamp(from));
    }
    if let Some(to) = params.to {
        push("created_at", "<=", BindValue::Timestamp(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

fn entity_kind_str(kind: fundbridge_core::audit::EntityKind) -> &'static str {
    use fundbridge_core::audit::EntityKind;
    match kind {
        EntityKind::Campaign => "campaign",
        EntityKind::User => "user",
        EntityKind::Task => "task",
        EntityKind::Donation => "donation",
    }
}

#[cfg(test)]
mod tests {
    use fundbridge_core::audit::{AuditAction, EntityKind};

    use super::*;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let (clause, values, next) = build_audit_filter(&AuditQuery::default());
        assert!(clause.is_empty());
        assert!(values.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn filters_are_numbered_in_order() {
        let params = AuditQuery {
            entity_kind: Some(EntityKind::Donation),
            entity_id: Some(7),
            action: Some(AuditAction::DonationRefunded),
            ..Default::default()
        };
        let (clause, values, next) = build_audit_filter(&params);
        assert_eq!(
            clause,
            "WHERE entity_kind = $1 AND entity_id = $2 AND action = $3"
        );
        assert_eq!(values.len(), 3);
        assert_eq!(next, 4);
    }
}
