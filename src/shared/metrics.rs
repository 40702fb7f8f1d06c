//! Metrics utilities module
//!
//! Prometheus counters for checkout transitions, rejections and expiry sweeps.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::shared::error::{AppError, AppResult};

/// Checkout metrics registry
#[derive(Clone)]
pub struct CheckoutMetrics {
    registry: Registry,
    transitions: IntCounterVec,
    rejections: IntCounterVec,
    sweep_deleted: IntCounter,
    sweep_failures: IntCounter,
}

fn register_err(e: prometheus::Error) -> AppError {
    AppError::Internal(format!("metrics registration failed: {}", e))
}

impl CheckoutMetrics {
    /// Create a new metrics instance with its own registry
    pub fn new() -> AppResult<Self> {
        let registry = Registry::new();

        let transitions = IntCounterVec::new(
            Opts::new("checkout_transitions_total", "Provisional order lifecycle transitions"),
            &["transition"],
        )
        .map_err(register_err)?;
        let rejections = IntCounterVec::new(
            Opts::new("checkout_rejections_total", "Rejected checkout requests by error kind"),
            &["kind"],
        )
        .map_err(register_err)?;
        let sweep_deleted = IntCounter::new("checkout_sweep_deleted_total", "Provisional orders removed by the expiry sweep")
            .map_err(register_err)?;
        let sweep_failures = IntCounter::new("checkout_sweep_failures_total", "Expiry sweep deletions that were refused or failed")
            .map_err(register_err)?;

        registry.register(Box::new(transitions.clone())).map_err(register_err)?;
        registry.register(Box::new(rejections.clone())).map_err(register_err)?;
        registry.register(Box::new(sweep_deleted.clone())).map_err(register_err)?;
        registry.register(Box::new(sweep_failures.clone())).map_err(register_err)?;

        Ok(Self { registry, transitions, rejections, sweep_deleted, sweep_failures })
    }

    pub fn record_transition(&self, transition: &str) {
        self.transitions.with_label_values(&[transition]).inc();
    }

    pub fn record_rejection(&self, error: &AppError) {
        self.rejections.with_label_values(&[error.kind()]).inc();
    }

    pub fn record_sweep(&self, deleted: u64, failures: u64) {
        self.sweep_deleted.inc_by(deleted);
        self.sweep_failures.inc_by(failures);
    }

    pub fn transition_count(&self, transition: &str) -> u64 {
        self.transitions.with_label_values(&[transition]).get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> AppResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| AppError::Internal(format!("metrics encoding failed: {}", e)))?;
        String::from_utf8(buffer).map_err(|e| AppError::Internal(format!("metrics encoding failed: {}", e)))
    }
}
