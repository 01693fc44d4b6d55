//! Campaign service: creation, reads, administrator moderation edits, and
//! soft deletion.
//!
//! Edits touch only the non-ledger field set and are conditional on the
//! status the edit was validated against, so they never overwrite the
//! ledger's totals and a concurrent moderation change surfaces as `Conflict`.

use fundbridge_core::audit::{changed_fields, AuditAction, EntityRef};
use fundbridge_core::campaign::{
    validate_description, validate_goal, validate_status_change, validate_title,
};
use fundbridge_core::error::CoreError;
use fundbridge_core::notification::NotificationType;
use fundbridge_core::roles::{Actor, Role};
use fundbridge_core::types::DbId;
use fundbridge_db::models::audit::AuditChanges;
use fundbridge_db::models::campaign::{Campaign, CreateCampaign, UpdateCampaign};

use crate::emitter::{audit_entry, notification, Emitter};
use crate::store::FundingStore;

/// The administrator-editable fields of a campaign, for audit diffs.
fn editable_snapshot(campaign: &Campaign) -> serde_json::Value {
    serde_json::json!({
        "title": campaign.title,
        "description": campaign.description,
        "goal_cents": campaign.goal_cents,
        "beneficiary_id": campaign.beneficiary_id,
        "status": campaign.status,
    })
}

#[derive(Clone)]
pub struct CampaignService<S> {
    store: S,
    emitter: Emitter<S>,
}

impl<S: FundingStore> CampaignService<S> {
    pub fn new(store: S, emitter: Emitter<S>) -> Self {
        Self { store, emitter }
    }

    /// Create a draft campaign owned by `creator`.
    pub async fn create_campaign(
        &self,
        creator: &Actor,
        input: CreateCampaign,
    ) -> Result<Campaign, CoreError> {
        validate_title(&input.title)?;
        if let Some(description) = &input.description {
            validate_description(description)?;
        }
        validate_goal(input.goal_cents)?;

        let campaign = self.store.insert_campaign(creator.user_id, &input).await?;
        tracing::info!(
            campaign_id = campaign.id,
            creator_id = creator.user_id,
            goal_cents = campaign.goal_cents,
            "Campaign created",
        );

        let mut entry = audit_entry(
            AuditAction::CampaignCreated,
            EntityRef::campaign(campaign.id),
            Some(creator),
        );
        entry.details = Some(editable_snapshot(&campaign));
        self.emitter.record(entry).await;

        Ok(campaign)
    }

    pub async fn get_campaign(&self, id: DbId) -> Result<Campaign, CoreError> {
        self.store
            .find_campaign(id)
            .await?
            .ok_or_else(|| CoreError::not_found("campaign", id))
    }

    /// Administrator edit of the non-ledger fields.
    pub async fn edit_campaign(
        &self,
        campaign_id: DbId,
        input: UpdateCampaign,
        admin: &Actor,
    ) -> Result<Campaign, CoreError> {
        admin.require_admin()?;
        if input.is_empty() {
            return Err(CoreError::Validation("No fields to update".into()));
        }
        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        if let Some(description) = &input.description {
            validate_description(description)?;
        }
        if let Some(goal) = input.goal_cents {
            validate_goal(goal)?;
        }

        let before = self.get_campaign(campaign_id).await?;
        if let Some(next) = input.status {
            validate_status_change(before.status, next)?;
        }

        let transition = self
            .store
            .update_campaign(campaign_id, before.status, &input)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!("Campaign {campaign_id} changed concurrently"))
            })?;
        let after = &transition.campaign;

        let before_json = editable_snapshot(&before);
        let after_json = editable_snapshot(after);
        let fields = changed_fields(&before_json, &after_json);
        tracing::info!(campaign_id, fields = ?fields, "Campaign edited");

        let mut entry = audit_entry(
            AuditAction::CampaignUpdated,
            EntityRef::campaign(campaign_id),
            Some(admin),
        );
        entry.changes = Some(AuditChanges {
            before: before_json,
            after: after_json,
            fields,
        });
        self.emitter.record(entry).await;

        if transition.status_changed() {
            let mut note = notification(
                after.creator_id,
                Role::Donee,
                NotificationType::CampaignStatusChanged,
                "Campaign status changed",
                format!(
                    "'{}' moved from {} to {}.",
                    after.title, transition.prev_status, after.status
                ),
            );
            note.campaign_id = Some(campaign_id);
            self.emitter.notify(note).await;
        }
        if transition.auto_completed() && input.status.is_none_or(|s| s != after.status) {
            self.emitter.campaign_completed(after).await;
        }

        Ok(transition.campaign)
    }

    /// Soft delete. A second call reports `NotFound`.
    pub async fn delete_campaign(&self, id: DbId, admin: &Actor) -> Result<(), CoreError> {
        admin.require_admin()?;
        if !self.store.soft_delete_campaign(id).await? {
            return Err(CoreError::not_found("campaign", id));
        }
        tracing::info!(campaign_id = id, "Campaign deleted");

        let entry = audit_entry(AuditAction::CampaignDeleted, EntityRef::campaign(id), Some(admin));
        self.emitter.record(entry).await;
        Ok(())
    }
}
