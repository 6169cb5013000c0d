use crate::config::RecoverySweepSettings;
use crate::context::RequestContext;
use crate::coordinator::transfer_coordinator::TransferCoordinator;
use crate::error::Result;
use crate::repositories::TransferRecordRepository;
use chrono::Utc;
use std::time::Duration;

/// Bound on how many stale records one sweep tick claims, so a large backlog is drained
/// incrementally across several intervals instead of in one unbounded burst.
const SWEEP_BATCH_LIMIT: i64 = 100;

/// Periodic re-dispatch of orphaned PENDING records (§4.4). Runs once immediately on
/// startup and then on a fixed interval. Re-dispatch goes through the same
/// `applyTransfer` idempotency shortcut as any other dispatch, so a record that actually
/// completed before a restart settles to COMPLETED without double-applying.
pub struct RecoverySweep {
    transfer_records: TransferRecordRepository,
    coordinator: TransferCoordinator,
    sweep_age_seconds: i64,
    interval: Duration,
}

impl RecoverySweep {
    pub fn new(
        transfer_records: TransferRecordRepository,
        coordinator: TransferCoordinator,
        settings: &RecoverySweepSettings,
    ) -> Self {
        Self {
            transfer_records,
            coordinator,
            sweep_age_seconds: settings.sweep_age_seconds,
            interval: Duration::from_secs(settings.interval_seconds.max(1)),
        }
    }

    /// Spawns the sweep loop on the runtime and returns its handle.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.sweep_once().await {
                tracing::error!(error = %err, "recovery sweep tick failed");
            }
        }
    }

    async fn sweep_once(&self) -> Result<()> {
        let threshold = Utc::now() - chrono::Duration::seconds(self.sweep_age_seconds);
        let stale = self.transfer_records.claim_stale_pending(threshold, SWEEP_BATCH_LIMIT).await?;

        if !stale.is_empty() {
            tracing::info!(count = stale.len(), "recovery sweep re-dispatching stale pending transfers");
        }

        for record in stale {
            self.coordinator.dispatch(RequestContext::generate(), record).await;
        }

        Ok(())
    }
}
