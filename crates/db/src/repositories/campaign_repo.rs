//! Repository for the `campaigns` table.

use sqlx::PgPool;
use fundbridge_core::campaign::CampaignStatus;
use fundbridge_core::types::DbId;

use crate::models::campaign::{Campaign, CampaignTransition, CreateCampaign, UpdateCampaign};

/// Column list for `campaigns` queries.
pub(crate) const COLUMNS: &str = "\
    id, creator_id, beneficiary_id, title, description, goal_cents, raised_cents, \
    status, donation_count, unique_donors, average_donation_cents, \
    completion_percentage, last_donation_at, completed_at, deleted_at, \
    created_at, updated_at";

/// SQL expression for `completion_percentage` given raised and goal expressions.
pub(crate) fn completion_sql(raised: &str, goal: &str) -> String {
    format!(
        "CASE WHEN {goal} <= 0 THEN 0 \
              ELSE LEAST(({raised})::float8 / ({goal}), 1.0) * 100 END"
    )
}

/// Provides CRUD operations for campaigns.
pub struct CampaignRepo;

impl CampaignRepo {
    /// Insert a new draft campaign.
    pub async fn create(
        pool: &PgPool,
        creator_id: DbId,
        input: &CreateCampaign,
    ) -> Result<Campaign, sqlx::Error> {
        let query = format!(
            "INSERT INTO campaigns (creator_id, beneficiary_id, title, description, goal_cents, status) \
             VALUES ($1, $2, $3, COALESCE($4, ''), $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(creator_id)
            .bind(input.beneficiary_id)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(input.goal_cents)
            .bind(CampaignStatus::Draft)
            .fetch_one(pool)
            .await
    }

    /// Find an active (not soft-deleted) campaign.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Campaign>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM campaigns WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Apply an administrator edit to the non-ledger fields.
    ///
    /// The write only lands while the campaign is still in `expected_status`;
    /// `None` means the row is gone or its status moved underneath the caller.
    /// Ledger columns are read, never written, except that completion
    /// percentage and auto-completion are recomputed against the new goal.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        expected_status: CampaignStatus,
        input: &UpdateCampaign,
    ) -> Result<Option<CampaignTransition>, sqlx::Error> {
        let goal = "COALESCE($5, c.goal_cents)";
        let status = "COALESCE($6, c.status)";
        let reaches_goal = format!("{status} = 'live' AND c.raised_cents >= {goal}");
        let completion = completion_sql("c.raised_cents", goal);
        let query = format!(
            "WITH prev AS ( \
                 SELECT status AS prev_status FROM campaigns \
                 WHERE id = $1 AND deleted_at IS NULL \
                 FOR UPDATE \
             ) \
             UPDATE campaigns c SET \
                 title = COALESCE($2, c.title), \
                 description = COALESCE($3, c.description), \
                 beneficiary_id = COALESCE($4, c.beneficiary_id), \
                 goal_cents = {goal}, \
                 status = CASE WHEN {reaches_goal} THEN 'completed' ELSE {status} END, \
                 completed_at = CASE WHEN {reaches_goal} OR {status} = 'completed' \
                                     THEN COALESCE(c.completed_at, NOW()) \
                                     ELSE c.completed_at END, \
                 completion_percentage = {completion}, \
                 updated_at = NOW() \
             FROM prev \
             WHERE c.id = $1 AND prev.prev_status = $7 \
             RETURNING {}, prev.prev_status",
            qualified("c")
        );
        sqlx::query_as::<_, CampaignTransition>(&query)
            .bind(id)
            .bind(input.title.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.beneficiary_id)
            .bind(input.goal_cents)
            .bind(input.status)
            .bind(expected_status)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a campaign. Returns `true` if a live row was marked.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE campaigns SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// `COLUMNS` with every column qualified by `alias`.
pub(crate) fn qualified(alias: &str) -> String {
    COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_prefixes_every_column() {
        let cols = qualified("c");
        assert!(cols.starts_with("c.id, c.creator_id"));
        assert!(cols.ends_with("c.updated_at"));
        assert!(cols.split(", ").all(|c| c.starts_with("c.")));
        assert_eq!(cols.split(", ").count(), COLUMNS.split(',').count());
    }

    #[test]
    fn completion_sql_guards_zero_goal() {
        let sql = completion_sql("raised_cents", "goal_cents");
        assert!(sql.contains("WHEN goal_cents <= 0 THEN 0"));
        assert!(sql.contains("LEAST((raised_cents)::float8 / (goal_cents), 1.0) * 100"));
    }
}
