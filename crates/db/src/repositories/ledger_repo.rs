//! The campaign ledger's atomic application of a completed donation.

use sqlx::PgPool;
use fundbridge_core::campaign::CampaignStatus;
use fundbridge_core::donation::PaymentStatus;
use fundbridge_core::types::{Cents, DbId};

use crate::models::campaign::Campaign;
use crate::models::donation::LedgerApplication;
use crate::repositories::campaign_repo::{self, completion_sql};

/// Applies completed donations to campaign accumulators.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Apply a completed donation to its campaign exactly once.
    ///
    /// In one transaction: claim the donation (`ledgered_at IS NULL -> NOW()`),
    /// lock the campaign row, decide whether the donor is new to this
    /// campaign, then increment the accumulators in a single UPDATE that
    /// also auto-completes a live campaign reaching its goal.
    ///
    /// Returns `None` if the donation is already ledgered or not completed.
    pub async fn apply_completed_donation(
        pool: &PgPool,
        donation_id: DbId,
    ) -> Result<Option<LedgerApplication>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let claimed: Option<(DbId, Option<DbId>, Cents, String)> = sqlx::query_as(
            "UPDATE donations SET ledgered_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND ledgered_at IS NULL AND payment_status = $2 \
             RETURNING campaign_id, donor_id, amount_cents, receipt_number",
        )
        .bind(donation_id)
        .bind(PaymentStatus::Completed)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((campaign_id, donor_id, amount_cents, receipt_number)) = claimed else {
            tx.rollback().await?;
            return Ok(None);
        };

        // Serialises concurrent credits so the donor check below sees every
        // previously committed credit for this campaign.
        let prev_status: CampaignStatus =
            sqlx::query_scalar("SELECT status FROM campaigns WHERE id = $1 FOR UPDATE")
                .bind(campaign_id)
                .fetch_one(&mut *tx)
                .await?;

        let new_donor = match donor_id {
            Some(donor_id) => {
                sqlx::query_scalar::<_, bool>(
                    "SELECT NOT EXISTS ( \
                         SELECT 1 FROM donations \
                         WHERE campaign_id = $1 AND donor_id = $2 \
                           AND ledgered_at IS NOT NULL AND id <> $3 \
                     )",
                )
                .bind(campaign_id)
                .bind(donor_id)
                .bind(donation_id)
                .fetch_one(&mut *tx)
                .await?
            }
            None => false,
        };

        let raised = "raised_cents + $2";
        let reaches_goal = format!("status = 'live' AND {raised} >= goal_cents");
        let completion = completion_sql(raised, "goal_cents");
        let query = format!(
            "UPDATE campaigns SET \
                 raised_cents = {raised}, \
                 donation_count = donation_count + 1, \
                 unique_donors = unique_donors + $3, \
                 average_donation_cents = ({raised}) / (donation_count + 1), \
                 completion_percentage = {completion}, \
                 last_donation_at = NOW(), \
                 status = CASE WHEN {reaches_goal} THEN 'completed' ELSE status END, \
                 completed_at = CASE WHEN {reaches_goal} THEN NOW() ELSE completed_at END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            campaign_repo::COLUMNS
        );
        let campaign = sqlx::query_as::<_, Campaign>(&query)
            .bind(campaign_id)
            .bind(amount_cents)
            .bind(i64::from(new_donor))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let auto_completed =
            prev_status == CampaignStatus::Live && campaign.status == CampaignStatus::Completed;
        Ok(Some(LedgerApplication {
            donation_id,
            donor_id,
            receipt_number,
            amount_cents,
            new_donor,
            auto_completed,
            campaign,
        }))
    }
}
