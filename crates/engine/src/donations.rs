//! Donation Recorder: turns confirmed payments into durable donation
//! records and drives the ledger exactly once per donation.

use chrono::Utc;
use fundbridge_core::audit::{AuditAction, EntityRef};
use fundbridge_core::donation::{
    generate_receipt_number, validate_amount_and_fee, validate_external_payment_id,
    validate_refund, AnonymousDonor, PaymentMethod, PaymentStatus, MAX_RECEIPT_ATTEMPTS,
};
use fundbridge_core::error::CoreError;
use fundbridge_core::money::format_cents;
use fundbridge_core::notification::NotificationType;
use fundbridge_core::roles::{Actor, Role};
use fundbridge_core::types::{Cents, DbId};
use fundbridge_db::models::donation::{Donation, NewDonation, RefundOutcome, RefundRequest};
use serde::{Deserialize, Serialize};

use crate::emitter::{audit_entry, notification, Emitter};
use crate::ledger::CampaignLedger;
use crate::store::{FundingStore, EXTERNAL_PAYMENT_CONSTRAINT, RECEIPT_CONSTRAINT};

/// Input for recording a donation.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordDonation {
    pub campaign_id: DbId,
    pub donor_id: Option<DbId>,
    pub anonymous_donor: Option<AnonymousDonor>,
    pub amount_cents: Cents,
    pub transaction_fee_cents: Option<Cents>,
    pub payment_method: PaymentMethod,
    pub external_payment_id: String,
    pub payment_status: PaymentStatus,
}

/// A recorded donation. `replayed` is `true` when the external payment id
/// had already been recorded and the existing donation is returned.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedDonation {
    pub donation: Donation,
    pub replayed: bool,
}

#[derive(Clone)]
pub struct DonationRecorder<S> {
    store: S,
    ledger: CampaignLedger<S>,
    emitter: Emitter<S>,
}

impl<S: FundingStore> DonationRecorder<S> {
    pub fn new(store: S, ledger: CampaignLedger<S>, emitter: Emitter<S>) -> Self {
        Self {
            store,
            ledger,
            emitter,
        }
    }

    /// Record a donation, deduplicated on `external_payment_id`.
    pub async fn record_donation(
        &self,
        actor: &Actor,
        mut input: RecordDonation,
    ) -> Result<RecordedDonation, CoreError> {
        input.external_payment_id = input.external_payment_id.trim().to_string();
        let fee = input.transaction_fee_cents.unwrap_or(0);
        validate_amount_and_fee(input.amount_cents, fee)?;
        validate_external_payment_id(&input.external_payment_id)?;
        validate_donor(actor, &input)?;
        if !input.payment_status.is_valid_initial() {
            return Err(CoreError::Validation(format!(
                "A donation cannot be recorded as '{}'",
                input.payment_status
            )));
        }

        if let Some(existing) = self
            .store
            .find_donation_by_external_id(&input.external_payment_id)
            .await?
        {
            return self.replay(existing, &input).await;
        }

        let campaign = self
            .store
            .find_campaign(input.campaign_id)
            .await?
            .ok_or_else(|| {
                CoreError::Validation(format!("Campaign {} does not exist", input.campaign_id))
            })?;
        if !campaign.status.accepts_donations() {
            return Err(CoreError::Validation(format!(
                "Campaign {} is {} and does not accept donations",
                campaign.id, campaign.status
            )));
        }

        let mut new_donation = NewDonation {
            campaign_id: input.campaign_id,
            donor_id: input.donor_id,
            anonymous_donor: input.anonymous_donor.clone(),
            amount_cents: input.amount_cents,
            transaction_fee_cents: fee,
            payment_method: input.payment_method,
            payment_status: input.payment_status,
            external_payment_id: input.external_payment_id.clone(),
            receipt_number: String::new(),
            recorded_by: actor.is_admin().then_some(actor.user_id),
        };

        let mut inserted = None;
        for attempt in 1..=MAX_RECEIPT_ATTEMPTS {
            new_donation.receipt_number = generate_receipt_number(Utc::now().date_naive());
            match self.store.insert_donation(&new_donation).await {
                Ok(donation) => {
                    inserted = Some(donation);
                    break;
                }
                Err(e) if e.is_unique_violation(RECEIPT_CONSTRAINT) => {
                    tracing::warn!(
                        attempt,
                        receipt_number = %new_donation.receipt_number,
                        "Receipt number collision, regenerating",
                    );
                }
                Err(e) if e.is_unique_violation(EXTERNAL_PAYMENT_CONSTRAINT) => {
                    // A concurrent delivery of the same confirmation won the insert.
                    let existing = self
                        .store
                        .find_donation_by_external_id(&new_donation.external_payment_id)
                        .await?
                        .ok_or_else(|| CoreError::Conflict(e.to_string()))?;
                    return self.replay(existing, &input).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        let donation = inserted.ok_or_else(|| {
            CoreError::Conflict(format!(
                "Could not allocate a unique receipt number after {MAX_RECEIPT_ATTEMPTS} attempts"
            ))
        })?;

        tracing::info!(
            donation_id = donation.id,
            campaign_id = donation.campaign_id,
            amount_cents = donation.amount_cents,
            payment_status = %donation.payment_status,
            receipt_number = %donation.receipt_number,
            "Donation recorded",
        );

        if actor.is_admin() {
            let mut entry = audit_entry(
                AuditAction::DonationRecorded,
                EntityRef::donation(donation.id),
                Some(actor),
            );
            entry.details = Some(serde_json::json!({
                "campaign_id": donation.campaign_id,
                "amount_cents": donation.amount_cents,
                "payment_method": donation.payment_method,
                "payment_status": donation.payment_status,
                "receipt_number": donation.receipt_number,
            }));
            self.emitter.record(entry).await;
        }

        let donation = if donation.payment_status == PaymentStatus::Completed {
            self.settle(donation).await?
        } else {
            donation
        };

        Ok(RecordedDonation {
            donation,
            replayed: false,
        })
    }

    /// Gateway confirmation: advance the payment status of a recorded donation.
    pub async fn confirm_payment(
        &self,
        actor: &Actor,
        external_payment_id: &str,
        status: PaymentStatus,
    ) -> Result<Donation, CoreError> {
        if !matches!(actor.role, Role::System | Role::Admin) {
            return Err(CoreError::Forbidden(
                "Only the payment processor may confirm payments".into(),
            ));
        }
        validate_external_payment_id(external_payment_id)?;

        let donation = self
            .store
            .find_donation_by_external_id(external_payment_id.trim())
            .await?
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "No donation recorded for payment '{external_payment_id}'"
                ))
            })?;

        if donation.payment_status == status {
            tracing::debug!(donation_id = donation.id, %status, "Duplicate payment confirmation");
            if status == PaymentStatus::Completed && !donation.is_ledgered() {
                return self.settle(donation).await;
            }
            return Ok(donation);
        }
        if !donation.payment_status.can_transition_to(status) {
            return Err(CoreError::InvalidState(format!(
                "Payment cannot move from '{}' to '{status}'",
                donation.payment_status
            )));
        }

        let updated = self
            .store
            .transition_payment_status(donation.id, donation.payment_status, status)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Donation {} changed status concurrently",
                    donation.id
                ))
            })?;

        tracing::info!(
            donation_id = updated.id,
            from = %donation.payment_status,
            to = %status,
            "Payment status updated",
        );

        if status == PaymentStatus::Completed {
            self.settle(updated).await
        } else {
            Ok(updated)
        }
    }

    /// Refund a completed donation and reverse its ledger contribution.
    pub async fn refund_donation(
        &self,
        admin: &Actor,
        donation_id: DbId,
        amount_cents: Cents,
        reason: &str,
    ) -> Result<RefundOutcome, CoreError> {
        admin.require_admin()?;
        let donation = self
            .store
            .find_donation(donation_id)
            .await?
            .ok_or_else(|| CoreError::not_found("donation", donation_id))?;

        if donation.payment_status != PaymentStatus::Completed {
            return Err(CoreError::InvalidState(format!(
                "Only completed donations can be refunded; donation is '{}'",
                donation.payment_status
            )));
        }
        validate_refund(donation.amount_cents, amount_cents, reason)?;

        let refund = RefundRequest {
            amount_cents,
            reason: reason.trim().to_string(),
            refunded_by: admin.user_id,
        };
        let outcome = self
            .store
            .refund_donation(donation_id, &refund)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!("Donation {donation_id} changed status concurrently"))
            })?;

        tracing::info!(
            donation_id,
            amount_cents,
            reversed = outcome.campaign.is_some(),
            "Donation refunded",
        );

        let mut entry = audit_entry(
            AuditAction::DonationRefunded,
            EntityRef::donation(donation_id),
            Some(admin),
        );
        entry.details = Some(serde_json::json!({
            "campaign_id": donation.campaign_id,
            "amount_cents": amount_cents,
            "reason": refund.reason,
            "ledger_reversed": outcome.campaign.is_some(),
        }));
        self.emitter.record(entry).await;

        if let Some(donor_id) = outcome.donation.donor_id {
            let mut note = notification(
                donor_id,
                Role::Donor,
                NotificationType::RefundProcessed,
                "Refund processed",
                format!(
                    "{} of your donation {} has been refunded.",
                    format_cents(amount_cents),
                    outcome.donation.receipt_number
                ),
            );
            note.campaign_id = Some(outcome.donation.campaign_id);
            note.donation_id = Some(donation_id);
            self.emitter.notify(note).await;
        }

        Ok(outcome)
    }

    /// Read a donation. Visible to administrators and the donor of record.
    pub async fn get_donation(&self, actor: &Actor, id: DbId) -> Result<Donation, CoreError> {
        let donation = self
            .store
            .find_donation(id)
            .await?
            .ok_or_else(|| CoreError::not_found("donation", id))?;
        if actor.is_admin() || donation.donor_id == Some(actor.user_id) {
            Ok(donation)
        } else {
            Err(CoreError::Forbidden(
                "Donations are visible only to their donor".into(),
            ))
        }
    }

    /// Return an already-recorded donation for a re-submitted payment id.
    async fn replay(
        &self,
        existing: Donation,
        input: &RecordDonation,
    ) -> Result<RecordedDonation, CoreError> {
        if existing.campaign_id != input.campaign_id || existing.amount_cents != input.amount_cents
        {
            return Err(CoreError::Conflict(format!(
                "Payment '{}' was already recorded for a different donation",
                existing.external_payment_id
            )));
        }
        tracing::info!(
            donation_id = existing.id,
            external_payment_id = %existing.external_payment_id,
            "Duplicate donation submission, returning existing record",
        );
        let donation =
            if existing.payment_status == PaymentStatus::Completed && !existing.is_ledgered() {
                self.settle(existing).await?
            } else {
                existing
            };
        Ok(RecordedDonation {
            donation,
            replayed: true,
        })
    }

    /// Apply a completed donation to the ledger.
    ///
    /// A ledger failure leaves the donation unledgered for reconciliation;
    /// the donation itself is already durable and is returned as is.
    async fn settle(&self, donation: Donation) -> Result<Donation, CoreError> {
        match self.ledger.apply_completed_donation(donation.id).await {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    donation_id = donation.id,
                    error = %e,
                    "Ledger application failed; donation left for reconciliation",
                );
                return Ok(donation);
            }
        }
        Ok(self.store.find_donation(donation.id).await?.unwrap_or(donation))
    }
}

/// Who a donation may be attributed to.
///
/// Exactly one of `donor_id` and `anonymous_donor` must be present. Donors
/// can only give as themselves; administrators and the payment processor
/// may record on anyone's behalf. Offline entries are administrator-only.
fn validate_donor(actor: &Actor, input: &RecordDonation) -> Result<(), CoreError> {
    match (input.donor_id, &input.anonymous_donor) {
        (Some(_), Some(_)) => {
            return Err(CoreError::Validation(
                "A donation has either a donor or an anonymous snapshot, not both".into(),
            ))
        }
        (None, None) => {
            return Err(CoreError::Validation(
                "A donor or an anonymous donor snapshot is required".into(),
            ))
        }
        _ => {}
    }

    let privileged = matches!(actor.role, Role::Admin | Role::System);
    if input.payment_method == PaymentMethod::Offline && !actor.is_admin() {
        return Err(CoreError::Forbidden(
            "Only administrators can record offline donations".into(),
        ));
    }
    if !privileged && input.donor_id.is_some_and(|id| id != actor.user_id) {
        return Err(CoreError::Forbidden(
            "Donations can only be recorded for yourself".into(),
        ));
    }
    Ok(())
}
