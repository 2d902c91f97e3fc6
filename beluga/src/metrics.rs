//! Prometheus metrics for batch orchestration.
//!
//! Conditionally compiled behind the `metrics` feature flag.
//!
//! # Metrics
//!
//! ## Counters
//! - `beluga_jobs_started_total` - Jobs admitted to a worker slot
//! - `beluga_jobs_completed_total` - Terminal outcomes, labeled by status
//! - `beluga_batches_completed_total` - Batches run to completion
//!
//! ## Gauges
//! - `beluga_active_jobs` - Currently occupied worker slots
//!
//! ## Histograms
//! - `beluga_job_duration_seconds` - Worker invocation wall-clock duration
#![cfg(feature = "metrics")]

use prometheus::{
    exponential_buckets, Counter, CounterVec, Gauge, HistogramVec, Opts, Registry,
};
use std::sync::LazyLock;

/// Global Prometheus registry for beluga metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Counter for jobs admitted to a worker slot.
pub static JOBS_STARTED_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    Counter::new(
        "beluga_jobs_started_total",
        "Total number of jobs admitted to a worker slot",
    )
    .expect("beluga_jobs_started_total metric creation failed")
});

/// Counter for terminal outcomes.
///
/// Labels:
/// - `status`: succeeded, failed, or launch_failed
pub static JOBS_COMPLETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "beluga_jobs_completed_total",
        "Total number of jobs that reached a terminal outcome",
    );
    CounterVec::new(opts, &["status"])
        .expect("beluga_jobs_completed_total metric creation failed")
});

/// Counter for completed batches.
pub static BATCHES_COMPLETED_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    Counter::new(
        "beluga_batches_completed_total",
        "Total number of batches run to completion",
    )
    .expect("beluga_batches_completed_total metric creation failed")
});

/// Gauge for currently occupied worker slots.
pub static ACTIVE_JOBS: LazyLock<Gauge> = LazyLock::new(|| {
    Gauge::new("beluga_active_jobs", "Currently occupied worker slots")
        .expect("beluga_active_jobs metric creation failed")
});

/// Histogram for worker invocation durations in seconds.
///
/// Labels:
/// - `status`: succeeded, failed, or launch_failed
pub static JOB_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let buckets = exponential_buckets(0.01, 2.0, 16).expect("bucket creation failed");
    let opts = prometheus::HistogramOpts::new(
        "beluga_job_duration_seconds",
        "Worker invocation wall-clock duration in seconds",
    )
    .buckets(buckets);
    HistogramVec::new(opts, &["status"])
        .expect("beluga_job_duration_seconds metric creation failed")
});

/// Initialize all metrics by registering them with the global registry.
///
/// Idempotent - calling it multiple times is safe.
pub fn init_metrics() -> anyhow::Result<()> {
    let registry = &*REGISTRY;

    for metric in [
        Box::new(JOBS_STARTED_TOTAL.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(JOBS_COMPLETED_TOTAL.clone()),
        Box::new(BATCHES_COMPLETED_TOTAL.clone()),
        Box::new(ACTIVE_JOBS.clone()),
        Box::new(JOB_DURATION_SECONDS.clone()),
    ] {
        if let Err(e) = registry.register(metric) {
            let msg = e.to_string();
            if !msg.contains("Duplicate metrics collector registration attempted") {
                return Err(e.into());
            }
        }
    }

    Ok(())
}

/// Record a job entering a worker slot.
pub fn record_job_started() {
    JOBS_STARTED_TOTAL.inc();
}

/// Record a terminal job outcome.
pub fn record_job_completed(status: &str) {
    JOBS_COMPLETED_TOTAL.with_label_values(&[status]).inc();
}

/// Record a batch running to completion.
pub fn record_batch_completed() {
    BATCHES_COMPLETED_TOTAL.inc();
}

/// Update the occupied-slot gauge.
pub fn set_active_jobs(active: f64) {
    ACTIVE_JOBS.set(active);
}

/// Observe a worker invocation duration.
pub fn observe_job_duration(status: &str, duration_secs: f64) {
    JOB_DURATION_SECONDS
        .with_label_values(&[status])
        .observe(duration_secs);
}

/// Gather all registered metrics in Prometheus text format.
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        init_metrics().expect("metrics initialization should succeed");
    }

    #[test]
    fn test_record_job_lifecycle() {
        record_job_started();
        record_job_completed("succeeded");
        record_job_completed("failed");
        record_job_completed("launch_failed");
        record_batch_completed();
    }

    #[test]
    fn test_set_active_jobs() {
        set_active_jobs(3.0);
    }

    #[test]
    fn test_observe_job_duration() {
        observe_job_duration("succeeded", 12.5);
    }

    #[test]
    fn test_gather_metrics() {
        init_metrics().expect("metrics initialization should succeed");

        record_job_started();
        record_job_completed("succeeded");

        let output = gather_metrics().expect("gather should succeed");
        assert!(output.contains("beluga_jobs_started_total"));
        assert!(output.contains("beluga_jobs_completed_total"));
    }
}
