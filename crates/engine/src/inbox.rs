//! Recipient-side notification operations and the expiry purge.

use fundbridge_core::error::CoreError;
use fundbridge_core::notification::clamp_page;
use fundbridge_core::types::DbId;
use fundbridge_db::models::notification::Notification;
use serde::Deserialize;

use crate::store::FundingStore;

/// Query parameters for listing a recipient's notifications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Clone)]
pub struct Inbox<S> {
    store: S,
}

impl<S: FundingStore> Inbox<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Unexpired notifications for `user_id`, newest first.
    pub async fn list(&self, user_id: DbId, query: &InboxQuery) -> Result<Vec<Notification>, CoreError> {
        let (limit, offset) = clamp_page(query.limit, query.offset);
        Ok(self
            .store
            .list_notifications(user_id, query.unread_only, limit, offset)
            .await?)
    }

    /// Mark one notification read. Only its recipient may do so; anything
    /// else reads as not found.
    pub async fn mark_read(&self, id: DbId, user_id: DbId) -> Result<(), CoreError> {
        if self.store.mark_notification_read(id, user_id).await? {
            Ok(())
        } else {
            Err(CoreError::not_found("notification", id))
        }
    }

    pub async fn mark_all_read(&self, user_id: DbId) -> Result<u64, CoreError> {
        let updated = self.store.mark_all_notifications_read(user_id).await?;
        tracing::debug!(user_id, updated, "Marked notifications read");
        Ok(updated)
    }

    pub async fn unread_count(&self, user_id: DbId) -> Result<i64, CoreError> {
        Ok(self.store.unread_notification_count(user_id).await?)
    }

    /// Delete notifications past their expiry.
    pub async fn purge_expired(&self) -> Result<u64, CoreError> {
        let deleted = self.store.purge_expired_notifications().await?;
        if deleted > 0 {
            tracing::info!(deleted, "Purged expired notifications");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use fundbridge_core::notification::NotificationType;
    use fundbridge_core::roles::Role;

    use super::*;
    use crate::emitter::notification;
    use crate::memory::MemoryStore;
    use crate::store::NotificationStore;

    async fn seed(store: &MemoryStore, recipient: DbId, n: usize) {
        for i in 0..n {
            store
                .create_notification(&notification(
                    recipient,
                    Role::Donor,
                    NotificationType::DonationReceived,
                    "Thank you",
                    format!("Donation {i}"),
                ))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn unread_count_tracks_reads() {
        let store = MemoryStore::new();
        let inbox = Inbox::new(store.clone());
        seed(&store, 7, 3).await;
        seed(&store, 8, 1).await;

        assert_eq!(inbox.unread_count(7).await.unwrap(), 3);
        let first = inbox.list(7, &InboxQuery::default()).await.unwrap()[0].id;
        inbox.mark_read(first, 7).await.unwrap();
        inbox.mark_read(first, 7).await.unwrap();
        assert_eq!(inbox.unread_count(7).await.unwrap(), 2);

        let unread = InboxQuery {
            unread_only: true,
            ..Default::default()
        };
        assert_eq!(inbox.list(7, &unread).await.unwrap().len(), 2);

        assert_eq!(inbox.mark_all_read(7).await.unwrap(), 2);
        assert_eq!(inbox.unread_count(7).await.unwrap(), 0);
        assert_eq!(inbox.unread_count(8).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn cannot_mark_someone_elses_notification() {
        let store = MemoryStore::new();
        let inbox = Inbox::new(store.clone());
        seed(&store, 7, 1).await;
        let id = inbox.list(7, &InboxQuery::default()).await.unwrap()[0].id;

        assert_matches!(
            inbox.mark_read(id, 8).await,
            Err(CoreError::NotFound { entity: "notification", .. })
        );
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let store = MemoryStore::new();
        let inbox = Inbox::new(store.clone());
        seed(&store, 7, 5).await;

        let query = InboxQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(inbox.list(7, &query).await.unwrap().len(), 1);

        let query = InboxQuery {
            limit: Some(2),
            offset: Some(4),
            ..Default::default()
        };
        assert_eq!(inbox.list(7, &query).await.unwrap().len(), 1);
    }
}
