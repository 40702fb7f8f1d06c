//! Recurring sweep deleting abandoned provisional orders

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::services::temp_orders::{DeleteOutcome, TempOrderLifecycle};
use crate::infrastructure::adapters::order_store::OrderRepository;
use crate::shared::error::AppResult;
use crate::shared::metrics::CheckoutMetrics;

/// Longest pause between sweeps
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub candidates: usize,
    pub deleted: usize,
    pub failures: usize,
}

/// Sweep cadence: hourly, or the threshold itself when that is shorter
pub fn cadence_for(threshold: Duration) -> Duration {
    threshold.min(MAX_SWEEP_INTERVAL).max(Duration::from_secs(1))
}

/// One sweep pass over expired provisional orders
#[derive(Clone)]
pub struct ExpirySweeper {
    lifecycle: Arc<TempOrderLifecycle>,
    orders: Arc<dyn OrderRepository>,
    threshold: Duration,
    metrics: CheckoutMetrics,
}

impl ExpirySweeper {
    pub fn new(
        lifecycle: Arc<TempOrderLifecycle>,
        orders: Arc<dyn OrderRepository>,
        threshold: Duration,
        metrics: CheckoutMetrics,
    ) -> Self {
        Self { lifecycle, orders, threshold, metrics }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Delete every provisional order created before `now - threshold`.
    /// A refusal or failure for one order never stops the sweep.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let threshold = chrono::Duration::from_std(self.threshold).unwrap_or(chrono::Duration::MAX);
        let cutoff = now.checked_sub_signed(threshold).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let candidates = self.orders.find_temporary_created_before(cutoff).await?;

        let mut report = SweepReport { candidates: candidates.len(), ..SweepReport::default() };
        for order_id in candidates {
            match self.lifecycle.delete_order(order_id).await {
                Ok(DeleteOutcome::Deleted(_)) => report.deleted += 1,
                Ok(DeleteOutcome::Absent) => debug!(order_id, "Expired order already gone"),
                Err(e) => {
                    report.failures += 1;
                    warn!(order_id, error = %e, "Expiry sweep could not delete provisional order");
                }
            }
        }

        self.metrics.record_sweep(report.deleted as u64, report.failures as u64);
        Ok(report)
    }

    pub async fn run_once(&self) -> AppResult<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Spawn the recurring sweep; abort the handle to stop it
    pub fn spawn(self) -> JoinHandle<()> {
        let cadence = cadence_for(self.threshold);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cadence);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                match self.run_once().await {
                    Ok(report) if report.deleted > 0 || report.failures > 0 => {
                        info!(
                            deleted = report.deleted,
                            failures = report.failures,
                            threshold_secs = self.threshold.as_secs(),
                            "Expiry sweep removed abandoned provisional orders"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Expiry sweep failed to list provisional orders");
                    }
                }
            }
        })
    }
}

struct Installed {
    threshold: Duration,
    handle: JoinHandle<()>,
}

/// Owns the single recurring sweep; reinstalling replaces the previous schedule
pub struct ExpiryScheduler {
    lifecycle: Arc<TempOrderLifecycle>,
    orders: Arc<dyn OrderRepository>,
    metrics: CheckoutMetrics,
    current: tokio::sync::Mutex<Option<Installed>>,
}

impl ExpiryScheduler {
    pub fn new(lifecycle: Arc<TempOrderLifecycle>, orders: Arc<dyn OrderRepository>, metrics: CheckoutMetrics) -> Self {
        Self { lifecycle, orders, metrics, current: tokio::sync::Mutex::new(None) }
    }

    pub fn sweeper(&self, threshold: Duration) -> ExpirySweeper {
        ExpirySweeper::new(self.lifecycle.clone(), self.orders.clone(), threshold, self.metrics.clone())
    }

    /// Install the sweep for `threshold`. The previous schedule is cancelled
    /// first; reinstalling an unchanged, running schedule is a no-op.
    pub async fn install(&self, threshold: Duration) {
        let mut current = self.current.lock().await;
        if let Some(installed) = current.as_ref() {
            if installed.threshold == threshold && !installed.handle.is_finished() {
                return;
            }
        }
        if let Some(previous) = current.take() {
            previous.handle.abort();
            info!(previous_secs = previous.threshold.as_secs(), "Cancelled previous expiry schedule");
        }

        let handle = self.sweeper(threshold).spawn();
        info!(
            threshold_secs = threshold.as_secs(),
            cadence_secs = cadence_for(threshold).as_secs(),
            "Expiry sweep scheduled"
        );
        *current = Some(Installed { threshold, handle });
    }

    pub async fn installed_threshold(&self) -> Option<Duration> {
        self.current.lock().await.as_ref().map(|i| i.threshold)
    }

    pub async fn shutdown(&self) {
        if let Some(installed) = self.current.lock().await.take() {
            installed.handle.abort();
        }
    }
}
