//! Prometheus metrics for sync passes.
//!
//! The binary installs the recorder once with [`install_recorder`] and hands
//! the returned handle to the HTTP layer, which renders it at `/metrics`.
//! Recording without an installed recorder is a no-op.
//!
//! # Example
//!
//! ```rust,no_run
//! use entrant_gateway_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use entrant_gateway_core::{Exclusion, RosterDiff};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the global Prometheus recorder and describe every metric.
///
/// # Errors
///
/// Returns error if the exporter cannot be built, or a recorder is already
/// installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!("sync_passes_total", "Sync passes by outcome");
    describe_counter!("sync_entrants_added_total", "Entrants added to the roster");
    describe_counter!("sync_entrants_updated_total", "Entrants updated or moved");
    describe_counter!(
        "sync_entrants_removed_total",
        "Entrants removed, duplicate repairs included"
    );
    describe_counter!(
        "sync_tickets_excluded_total",
        "Tickets excluded from a pass, by reason"
    );
    describe_histogram!("sync_pass_duration_seconds", "Wall time of a sync pass");
    describe_counter!(
        "token_refreshes_total",
        "Token endpoint refreshes by outcome"
    );

    describe_counter!("retry_attempts_total", "Roster commit retries");
    describe_counter!(
        "retry_successes_total",
        "Roster commits that succeeded after a retry"
    );
    describe_counter!(
        "retry_exhausted_total",
        "Roster commits that failed after max retries"
    );
}

/// Sync pass metrics recorder.
pub struct SyncMetrics;

impl SyncMetrics {
    /// Record a finished pass.
    pub fn record_pass(outcome: &'static str, duration: Duration) {
        counter!("sync_passes_total", "outcome" => outcome).increment(1);
        histogram!("sync_pass_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a committed diff.
    pub fn record_diff(diff: &RosterDiff) {
        counter!("sync_entrants_added_total").increment(diff.added.len() as u64);
        counter!("sync_entrants_updated_total").increment(diff.updated.len() as u64);
        counter!("sync_entrants_removed_total").increment(diff.removed_count() as u64);
    }

    /// Record a pass's exclusions.
    pub fn record_exclusions(excluded: &[Exclusion]) {
        for exclusion in excluded {
            counter!("sync_tickets_excluded_total", "reason" => exclusion.reason.label()).increment(1);
        }
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}
