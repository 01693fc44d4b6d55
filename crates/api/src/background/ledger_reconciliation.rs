//! Periodic reconciliation of completed donations missing from the ledger.

use std::time::Duration;

use fundbridge_engine::ledger::{CampaignLedger, MAX_RECONCILE_BATCH};
use fundbridge_engine::store::FundingStore;
use tokio_util::sync::CancellationToken;

/// Run a reconciliation pass every `every` until `cancel` is triggered.
pub async fn run<S: FundingStore>(
    ledger: CampaignLedger<S>,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = every.as_secs(), "Ledger reconciliation job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Ledger reconciliation job stopping");
                break;
            }
            _ = interval.tick() => {
                match ledger.reconcile(None, MAX_RECONCILE_BATCH).await {
                    Ok(report) if report.failed > 0 => tracing::warn!(
                        applied = report.applied,
                        failed = report.failed,
                        "Ledger reconciliation left donations queued",
                    ),
                    Ok(report) => tracing::debug!(applied = report.applied, "Ledger reconciliation pass"),
                    Err(e) => tracing::error!(error = %e, "Ledger reconciliation failed"),
                }
            }
        }
    }
}
