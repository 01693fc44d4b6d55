//! Audit/notification side channel.
//!
//! Both operations are best-effort: a failed write is logged at `warn` and
//! swallowed so it can never roll back or fail the business operation that
//! triggered it.

use fundbridge_core::audit::{redact_sensitive_fields, AuditAction, EntityRef};
use fundbridge_core::error::CoreError;
use fundbridge_core::money::format_cents;
use fundbridge_core::notification::NotificationType;
use fundbridge_core::roles::{Actor, Role};
use fundbridge_core::types::DbId;
use fundbridge_db::models::audit::{AuditChanges, AuditLog, AuditLogPage, AuditQuery, NewAuditLog};
use fundbridge_db::models::campaign::Campaign;
use fundbridge_db::models::donation::LedgerApplication;
use fundbridge_db::models::notification::{NewNotification, Notification};

use crate::store::FundingStore;

/// Build an audit entry with the action's default category and severity.
///
/// `actor = None` records the engine itself (system role, no user).
pub fn audit_entry(action: AuditAction, entity: EntityRef, actor: Option<&Actor>) -> NewAuditLog {
    NewAuditLog {
        action,
        entity,
        performed_by: actor.map(|a| a.user_id),
        actor_role: actor.map_or(Role::System, |a| a.role),
        category: action.category(),
        severity: action.default_severity(),
        changes: None,
        details: None,
    }
}

/// Build a notification with no entity references.
pub fn notification(
    recipient_id: DbId,
    recipient_role: Role,
    notification_type: NotificationType,
    title: impl Into<String>,
    message: impl Into<String>,
) -> NewNotification {
    NewNotification {
        recipient_id,
        recipient_role,
        notification_type,
        title: title.into(),
        message: message.into(),
        campaign_id: None,
        donation_id: None,
        task_id: None,
    }
}

/// Records audit entries and creates notifications.
#[derive(Clone)]
pub struct Emitter<S> {
    store: S,
}

impl<S: FundingStore> Emitter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append an audit entry. Details and changes are redacted first.
    pub async fn record(&self, mut entry: NewAuditLog) -> Option<AuditLog> {
        entry.details = entry.details.as_ref().map(redact_sensitive_fields);
        entry.changes = entry.changes.map(|c| AuditChanges {
            before: redact_sensitive_fields(&c.before),
            after: redact_sensitive_fields(&c.after),
            fields: c.fields,
        });

        match self.store.append_audit(&entry).await {
            Ok(log) => {
                tracing::debug!(
                    audit_id = log.id,
                    action = entry.action.as_str(),
                    entity_id = entry.entity.id,
                    "Audit entry recorded",
                );
                Some(log)
            }
            Err(e) => {
                tracing::warn!(
                    action = entry.action.as_str(),
                    entity_id = entry.entity.id,
                    error = %e,
                    "Failed to record audit entry",
                );
                None
            }
        }
    }

    /// Create a notification for a recipient.
    pub async fn notify(&self, input: NewNotification) -> Option<Notification> {
        match self.store.create_notification(&input).await {
            Ok(n) => {
                tracing::debug!(
                    notification_id = n.id,
                    recipient_id = input.recipient_id,
                    notification_type = input.notification_type.as_str(),
                    "Notification created",
                );
                Some(n)
            }
            Err(e) => {
                tracing::warn!(
                    recipient_id = input.recipient_id,
                    notification_type = input.notification_type.as_str(),
                    error = %e,
                    "Failed to create notification",
                );
                None
            }
        }
    }

    /// Announce that a campaign reached its goal: notify the creator and
    /// record a system audit entry.
    /// Thank the donor for a donation the ledger just credited. Anonymous
    /// gifts have no recipient.
    pub async fn donation_received(&self, applied: &LedgerApplication) {
        let Some(donor_id) = applied.donor_id else {
            return;
        };
        let mut note = notification(
            donor_id,
            Role::Donor,
            NotificationType::DonationReceived,
            "Thank you for your donation",
            format!(
                "Your donation of {} was received. Receipt {}.",
                format_cents(applied.amount_cents),
                applied.receipt_number
            ),
        );
        note.campaign_id = Some(applied.campaign.id);
        note.donation_id = Some(applied.donation_id);
        self.notify(note).await;
    }

    pub async fn campaign_completed(&self, campaign: &Campaign) {
        tracing::info!(
            campaign_id = campaign.id,
            raised_cents = campaign.raised_cents,
            goal_cents = campaign.goal_cents,
            "Campaign reached its goal",
        );

        let mut note = notification(
            campaign.creator_id,
            Role::Donee,
            NotificationType::CampaignCompleted,
            "Campaign fully funded",
            format!("'{}' reached its funding goal.", campaign.title),
        );
        note.campaign_id = Some(campaign.id);
        self.notify(note).await;

        let mut entry = audit_entry(
            AuditAction::CampaignCompleted,
            EntityRef::campaign(campaign.id),
            None,
        );
        entry.details = Some(serde_json::json!({
            "raised_cents": campaign.raised_cents,
            "goal_cents": campaign.goal_cents,
            "completed_at": campaign.completed_at,
        }));
        self.record(entry).await;
    }

    /// Administrator audit query.
    pub async fn query(&self, actor: &Actor, params: &AuditQuery) -> Result<AuditLogPage, CoreError> {
        actor.require_admin()?;
        if let (Some(from), Some(to)) = (params.from, params.to) {
            if from > to {
                return Err(CoreError::Validation(
                    "'from' must not be after 'to'".into(),
                ));
            }
        }
        Ok(self.store.query_audit(params).await?)
    }
}
