//! Periodic purge of expired notifications.

use std::time::Duration;

use fundbridge_engine::inbox::Inbox;
use fundbridge_engine::store::FundingStore;
use tokio_util::sync::CancellationToken;

/// Purge expired notifications every `every` until `cancel` is triggered.
pub async fn run<S: FundingStore>(inbox: Inbox<S>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Notification expiry job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Notification expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = inbox.purge_expired().await {
                    tracing::error!(error = %e, "Notification expiry: purge failed");
                }
            }
        }
    }
}
