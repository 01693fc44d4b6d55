//! Campaign Ledger: keeps a campaign's funding total and derived statistics
//! consistent with its completed donations.

use fundbridge_core::audit::{AuditAction, EntityRef};
use fundbridge_core::error::CoreError;
use fundbridge_core::roles::Actor;
use fundbridge_core::types::DbId;
use fundbridge_db::models::donation::LedgerApplication;
use serde::Serialize;

use crate::emitter::{audit_entry, Emitter};
use crate::store::FundingStore;

/// Upper bound on donations applied by one reconciliation pass.
pub const MAX_RECONCILE_BATCH: i64 = 1_000;

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Completed donations found without a ledger marker.
    pub scanned: usize,
    /// Donations applied by this pass.
    pub applied: usize,
    /// Donations another writer applied first.
    pub skipped: usize,
    /// Donations whose application failed; they stay queued.
    pub failed: usize,
}

#[derive(Clone)]
pub struct CampaignLedger<S> {
    store: S,
    emitter: Emitter<S>,
}

impl<S: FundingStore> CampaignLedger<S> {
    pub fn new(store: S, emitter: Emitter<S>) -> Self {
        Self { store, emitter }
    }

    /// Apply a completed donation to its campaign.
    ///
    /// The store claims the donation and increments the campaign atomically,
    /// so repeated calls for one donation credit it once, and only the call
    /// that credits it thanks the donor. `Ok(None)` means the donation was
    /// already applied or is not completed.
    pub async fn apply_completed_donation(
        &self,
        donation_id: DbId,
    ) -> Result<Option<LedgerApplication>, CoreError> {
        let Some(applied) = self.store.apply_to_ledger(donation_id).await? else {
            tracing::debug!(donation_id, "Donation already ledgered or not completed");
            return Ok(None);
        };

        tracing::info!(
            donation_id,
            campaign_id = applied.campaign.id,
            amount_cents = applied.amount_cents,
            raised_cents = applied.campaign.raised_cents,
            new_donor = applied.new_donor,
            "Donation applied to campaign ledger",
        );

        self.emitter.donation_received(&applied).await;
        if applied.auto_completed {
            self.emitter.campaign_completed(&applied.campaign).await;
        }
        Ok(Some(applied))
    }

    /// Apply every completed donation that was recorded but never ledgered.
    ///
    /// `actor` is `None` for the background job.
    pub async fn reconcile(
        &self,
        actor: Option<&Actor>,
        limit: i64,
    ) -> Result<ReconcileReport, CoreError> {
        if let Some(actor) = actor {
            actor.require_admin()?;
        }
        let pending = self
            .store
            .list_unledgered(limit.clamp(1, MAX_RECONCILE_BATCH))
            .await?;

        let mut report = ReconcileReport {
            scanned: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            return Ok(report);
        }
        tracing::warn!(count = pending.len(), "Found completed donations missing from the ledger");

        for donation in &pending {
            match self.apply_completed_donation(donation.id).await {
                Ok(Some(_)) => report.applied += 1,
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(donation_id = donation.id, error = %e, "Ledger reconciliation failed");
                }
            }
        }

        if report.applied > 0 {
            let mut entry = audit_entry(
                AuditAction::LedgerReconciled,
                EntityRef::donation(pending[0].id),
                actor,
            );
            entry.details = Some(serde_json::json!({
                "scanned": report.scanned,
                "applied": report.applied,
                "failed": report.failed,
                "donation_ids": pending.iter().map(|d| d.id).collect::<Vec<_>>(),
            }));
            self.emitter.record(entry).await;
        }

        tracing::info!(
            scanned = report.scanned,
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            "Ledger reconciliation pass complete",
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use fundbridge_core::audit::AuditAction;
    use fundbridge_core::campaign::CampaignStatus;
    use fundbridge_core::donation::{generate_receipt_number, PaymentMethod, PaymentStatus};
    use fundbridge_core::notification::NotificationType;
    use fundbridge_core::roles::Role;
    use fundbridge_db::models::campaign::CreateCampaign;
    use fundbridge_db::models::donation::NewDonation;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::{CampaignStore, DonationStore};

    async fn live_campaign(store: &MemoryStore, goal_cents: i64) -> DbId {
        let campaign = store
            .insert_campaign(
                10,
                &CreateCampaign {
                    title: "Library books".into(),
                    description: None,
                    goal_cents,
                    beneficiary_id: None,
                },
            )
            .await
            .unwrap();
        store.set_campaign_status(campaign.id, CampaignStatus::Live).unwrap();
        campaign.id
    }

    async fn donation(
        store: &MemoryStore,
        campaign_id: DbId,
        donor_id: DbId,
        amount_cents: i64,
        status: PaymentStatus,
    ) -> DbId {
        store
            .insert_donation(&NewDonation {
                campaign_id,
                donor_id: Some(donor_id),
                anonymous_donor: None,
                amount_cents,
                transaction_fee_cents: 0,
                payment_method: PaymentMethod::Card,
                payment_status: status,
                external_payment_id: format!("pi_{}", generate_receipt_number(Utc::now().date_naive())),
                receipt_number: generate_receipt_number(Utc::now().date_naive()),
                recorded_by: None,
            })
            .await
            .unwrap()
            .id
    }

    fn ledger(store: &MemoryStore) -> CampaignLedger<MemoryStore> {
        CampaignLedger::new(store.clone(), Emitter::new(store.clone()))
    }

    #[tokio::test]
    async fn applies_each_donation_once() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let campaign_id = live_campaign(&store, 10_000).await;
        let id = donation(&store, campaign_id, 5, 2_000, PaymentStatus::Completed).await;

        let applied = ledger.apply_completed_donation(id).await.unwrap().unwrap();
        assert_eq!(applied.amount_cents, 2_000);
        assert!(applied.new_donor);
        assert!(!applied.auto_completed);
        assert_eq!(applied.campaign.stats.average_donation_cents, 2_000);
        assert_eq!(applied.campaign.stats.completion_percentage, 20.0);

        assert_eq!(ledger.apply_completed_donation(id).await.unwrap(), None);
        let campaign = store.find_campaign(campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.raised_cents, 2_000);
        assert_eq!(campaign.stats.donation_count, 1);
    }

    #[tokio::test]
    async fn repeat_donor_is_not_unique() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let campaign_id = live_campaign(&store, 10_000).await;
        let first = donation(&store, campaign_id, 5, 1_000, PaymentStatus::Completed).await;
        let second = donation(&store, campaign_id, 5, 3_000, PaymentStatus::Completed).await;

        ledger.apply_completed_donation(first).await.unwrap();
        let applied = ledger.apply_completed_donation(second).await.unwrap().unwrap();
        assert!(!applied.new_donor);
        assert_eq!(applied.campaign.stats.unique_donors, 1);
        assert_eq!(applied.campaign.stats.donation_count, 2);
        assert_eq!(applied.campaign.stats.average_donation_cents, 2_000);
    }

    #[tokio::test]
    async fn pending_donation_is_not_applied() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let campaign_id = live_campaign(&store, 10_000).await;
        let id = donation(&store, campaign_id, 5, 1_000, PaymentStatus::Pending).await;

        assert_eq!(ledger.apply_completed_donation(id).await.unwrap(), None);
        assert_eq!(store.find_campaign(campaign_id).await.unwrap().unwrap().raised_cents, 0);
    }

    #[tokio::test]
    async fn reaching_goal_completes_and_announces() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let campaign_id = live_campaign(&store, 1_000).await;
        let id = donation(&store, campaign_id, 5, 1_500, PaymentStatus::Completed).await;

        let applied = ledger.apply_completed_donation(id).await.unwrap().unwrap();
        assert!(applied.auto_completed);
        assert_eq!(applied.campaign.status, CampaignStatus::Completed);
        assert!(applied.campaign.completed_at.is_some());
        assert_eq!(applied.campaign.stats.completion_percentage, 100.0);

        let notes = store.notifications().unwrap();
        let completed: Vec<_> = notes
            .iter()
            .filter(|n| n.notification_type == NotificationType::CampaignCompleted)
            .collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].recipient_id, 10);
        let audit = store.audit_entries().unwrap();
        assert_eq!(audit[0].action, AuditAction::CampaignCompleted);
        assert_eq!(audit[0].performed_by, None);
    }

    #[tokio::test]
    async fn reconcile_requires_admin_when_user_initiated() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let volunteer = Actor::new(3, Role::Volunteer);
        assert_matches!(
            ledger.reconcile(Some(&volunteer), 10).await,
            Err(CoreError::Forbidden(_))
        );
    }

    #[tokio::test]
    async fn reconcile_applies_backlog_and_audits() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let campaign_id = live_campaign(&store, 100_000).await;
        donation(&store, campaign_id, 5, 1_000, PaymentStatus::Completed).await;
        donation(&store, campaign_id, 6, 2_000, PaymentStatus::Completed).await;
        donation(&store, campaign_id, 7, 4_000, PaymentStatus::Failed).await;

        let admin = Actor::new(1, Role::Admin);
        let report = ledger.reconcile(Some(&admin), 10).await.unwrap();
        assert_eq!(
            report,
            ReconcileReport {
                scanned: 2,
                applied: 2,
                skipped: 0,
                failed: 0,
            }
        );

        let campaign = store.find_campaign(campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.raised_cents, 3_000);
        assert_eq!(campaign.stats.unique_donors, 2);

        let audit = store.audit_entries().unwrap();
        let entry = audit.last().unwrap();
        assert_eq!(entry.action, AuditAction::LedgerReconciled);
        assert_eq!(entry.performed_by, Some(1));
    }

    #[tokio::test]
    async fn reconcile_keeps_failures_queued() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let campaign_id = live_campaign(&store, 100_000).await;
        donation(&store, campaign_id, 5, 1_000, PaymentStatus::Completed).await;

        store.fail_ledger(true);
        let report = ledger.reconcile(None, 10).await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(store.audit_entries().unwrap().is_empty());

        store.fail_ledger(false);
        assert_eq!(ledger.reconcile(None, 10).await.unwrap().applied, 1);
    }

    fn thanks_for(store: &MemoryStore, donation_id: DbId) -> usize {
        store
            .notifications()
            .unwrap()
            .iter()
            .filter(|n| {
                n.notification_type == NotificationType::DonationReceived
                    && n.donation_id == Some(donation_id)
            })
            .count()
    }

    #[tokio::test]
    async fn crediting_thanks_the_donor_once() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let campaign_id = live_campaign(&store, 10_000).await;
        let id = donation(&store, campaign_id, 5, 2_500, PaymentStatus::Completed).await;

        ledger.apply_completed_donation(id).await.unwrap();
        ledger.apply_completed_donation(id).await.unwrap();

        assert_eq!(thanks_for(&store, id), 1);
        let note = store
            .notifications()
            .unwrap()
            .into_iter()
            .find(|n| n.donation_id == Some(id))
            .unwrap();
        assert_eq!(note.recipient_id, 5);
        assert_eq!(note.recipient_role, Role::Donor);
        assert_eq!(note.campaign_id, Some(campaign_id));
        assert!(note.message.contains("25.00"));
    }

    #[tokio::test]
    async fn reconciled_donation_thanks_the_donor() {
        let store = MemoryStore::new();
        let ledger = ledger(&store);
        let campaign_id = live_campaign(&store, 100_000).await;
        let id = donation(&store, campaign_id, 5, 1_000, PaymentStatus::Completed).await;

        store.fail_ledger(true);
        assert_matches!(ledger.apply_completed_donation(id).await, Err(_));
        assert_eq!(thanks_for(&store, id), 0);

        store.fail_ledger(false);
        assert_eq!(ledger.reconcile(None, 10).await.unwrap().applied, 1);
        assert_eq!(thanks_for(&store, id), 1);

        // A later pass finds nothing and sends nothing.
        assert_eq!(ledger.reconcile(None, 10).await.unwrap().scanned, 0);
        assert_eq!(thanks_for(&store, id), 1);
    }
}
