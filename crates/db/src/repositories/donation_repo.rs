//! Repository for the `donations` table.

use sqlx::types::Json;
use sqlx::PgPool;
use fundbridge_core::campaign::is_full_refund;
use fundbridge_core::donation::PaymentStatus;
use fundbridge_core::types::DbId;

use crate::models::campaign::Campaign;
use crate::models::donation::{Donation, NewDonation, RefundOutcome, RefundRequest};
use crate::repositories::campaign_repo::{self, completion_sql};

/// Column list for `donations` queries.
pub(crate) const COLUMNS: &str = "\
    id, campaign_id, donor_id, anonymous_donor, amount_cents, \
    transaction_fee_cents, net_amount_cents, payment_method, payment_status, \
    external_payment_id, receipt_number, recorded_by, ledgered_at, \
    refund_amount_cents, refund_reason, refunded_by, refunded_at, \
    created_at, updated_at";

/// Provides CRUD operations for donations.
pub struct DonationRepo;

impl DonationRepo {
    /// Insert a donation. Unique violations on the receipt number or the
    /// external payment id surface as database errors for the caller to
    /// classify.
    pub async fn create(pool: &PgPool, input: &NewDonation) -> Result<Donation, sqlx::Error> {
        let query = format!(
            "INSERT INTO donations \
                (campaign_id, donor_id, anonymous_donor, amount_cents, transaction_fee_cents, \
                 net_amount_cents, payment_method, payment_status, external_payment_id, \
                 receipt_number, recorded_by) \
             VALUES ($1, $2, $3, $4, $5, $4 - $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Donation>(&query)
            .bind(input.campaign_id)
            .bind(input.donor_id)
            .bind(input.anonymous_donor.clone().map(Json))
            .bind(input.amount_cents)
            .bind(input.transaction_fee_cents)
            .bind(input.payment_method)
            .bind(input.payment_status)
            .bind(&input.external_payment_id)
            .bind(&input.receipt_number)
            .bind(input.recorded_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Donation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM donations WHERE id = $1");
        sqlx::query_as::<_, Donation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Look up a donation by its idempotency key.
    pub async fn find_by_external_payment_id(
        pool: &PgPool,
        external_payment_id: &str,
    ) -> Result<Option<Donation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM donations WHERE external_payment_id = $1");
        sqlx::query_as::<_, Donation>(&query)
            .bind(external_payment_id)
            .fetch_optional(pool)
            .await
    }

    /// Move `payment_status` from `from` to `to`. `None` if the donation was
    /// no longer in `from`.
    pub async fn transition_status(
        pool: &PgPool,
        id: DbId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Donation>, sqlx::Error> {
        let query = format!(
            "UPDATE donations SET payment_status = $3, updated_at = NOW() \
             WHERE id = $1 AND payment_status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Donation>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(pool)
            .await
    }

    /// Completed donations that were never applied to their campaign ledger,
    /// oldest first.
    pub async fn list_unledgered(pool: &PgPool, limit: i64) -> Result<Vec<Donation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM donations \
             WHERE payment_status = $1 AND ledgered_at IS NULL \
             ORDER BY created_at ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Donation>(&query)
            .bind(PaymentStatus::Completed)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Refund a completed donation and, if it had been ledgered, reverse its
    /// contribution to the campaign in the same transaction.
    ///
    /// Returns `None` when the donation does not exist or is not `completed`.
    /// Campaign status is left untouched.
    pub async fn refund(
        pool: &PgPool,
        id: DbId,
        refund: &RefundRequest,
    ) -> Result<Option<RefundOutcome>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE donations SET \
                 payment_status = $2, \
                 refund_amount_cents = $3, \
                 refund_reason = $4, \
                 refunded_by = $5, \
                 refunded_at = NOW(), \
                 updated_at = NOW() \
             WHERE id = $1 AND payment_status = $6 \
             RETURNING {COLUMNS}"
        );
        let Some(donation) = sqlx::query_as::<_, Donation>(&query)
            .bind(id)
            .bind(PaymentStatus::Refunded)
            .bind(refund.amount_cents)
            .bind(&refund.reason)
            .bind(refund.refunded_by)
            .bind(PaymentStatus::Completed)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let campaign = if donation.is_ledgered() {
            // A partial refund leaves the donation counted.
            let raised = "GREATEST(raised_cents - $2, 0)";
            let count = "GREATEST(donation_count - $3, 0)";
            let completion = completion_sql(raised, "goal_cents");
            let query = format!(
                "UPDATE campaigns SET \
                     raised_cents = {raised}, \
                     donation_count = {count}, \
                     average_donation_cents = CASE WHEN {count} = 0 THEN 0 \
                                                   ELSE {raised} / {count} END, \
                     completion_percentage = {completion}, \
                     updated_at = NOW() \
                 WHERE id = $1 \
                 RETURNING {}",
                campaign_repo::COLUMNS
            );
            let campaign = sqlx::query_as::<_, Campaign>(&query)
                .bind(donation.campaign_id)
                .bind(refund.amount_cents)
                .bind(i64::from(is_full_refund(
                    refund.amount_cents,
                    donation.amount_cents,
                )))
                .fetch_one(&mut *tx)
                .await?;
            Some(campaign)
        } else {
            None
        };

        tx.commit().await?;
        Ok(Some(RefundOutcome { donation, campaign }))
    }
}
