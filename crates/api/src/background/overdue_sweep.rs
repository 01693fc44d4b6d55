//! Periodic persistence of the derived `overdue` task status.

use std::time::Duration;

use fundbridge_engine::store::FundingStore;
use fundbridge_engine::tasks::TaskEngine;
use tokio_util::sync::CancellationToken;

/// Run the overdue sweep every `every` until `cancel` is triggered.
pub async fn run<S: FundingStore>(tasks: TaskEngine<S>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Overdue sweep job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Overdue sweep job stopping");
                break;
            }
            _ = interval.tick() => {
                match tasks.sweep_overdue().await {
                    Ok(0) => tracing::debug!("Overdue sweep: nothing past deadline"),
                    Ok(marked) => tracing::info!(marked, "Overdue sweep: tasks marked overdue"),
                    Err(e) => tracing::error!(error = %e, "Overdue sweep failed"),
                }
            }
        }
    }
}
