//! Tracing instrumentation for batch orchestration.
//!
//! Span helpers for the batch and per-job lifecycle, plus recording
//! functions that log through `tracing` and, when the `metrics` feature is
//! enabled, update the Prometheus metrics as well. All functions are
//! no-ops on the metrics side when the feature is disabled.

use tracing::{info_span, Span};

/// Create a tracing span covering one batch run.
///
/// The span carries the batch id, job count, and concurrency limit.
#[must_use]
pub fn batch_span(batch_id: impl AsRef<str>, total: usize, concurrency: usize) -> Span {
    info_span!(
        "beluga.batch",
        batch_id = %batch_id.as_ref(),
        total = total,
        concurrency = concurrency,
    )
}

/// Create a tracing span for one worker invocation.
#[must_use]
pub fn job_dispatch_span(job_id: impl AsRef<str>, source: impl AsRef<str>) -> Span {
    info_span!(
        "beluga.dispatch",
        job_id = %job_id.as_ref(),
        source = %source.as_ref(),
    )
}

/// Record a job entering a worker slot.
pub fn record_job_started(job_id: impl AsRef<str>) {
    tracing::info!(job_id = %job_id.as_ref(), "job started");

    #[cfg(feature = "metrics")]
    crate::metrics::record_job_started();
}

/// Record a job reaching its terminal outcome.
pub fn record_job_completed(job_id: impl AsRef<str>, status: impl AsRef<str>) {
    tracing::info!(
        job_id = %job_id.as_ref(),
        status = %status.as_ref(),
        "job completed"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::record_job_completed(status.as_ref());
}

/// Record a batch finishing with its final tallies.
pub fn record_batch_completed(batch_id: impl AsRef<str>, succeeded: usize, failed: usize) {
    tracing::info!(
        batch_id = %batch_id.as_ref(),
        succeeded = succeeded,
        failed = failed,
        "batch completed"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::record_batch_completed();
}

/// Update the count of currently occupied worker slots.
pub fn set_active_jobs(active: usize) {
    tracing::trace!(active = active, "active jobs updated");

    #[cfg(feature = "metrics")]
    crate::metrics::set_active_jobs(active as f64);
}

/// Observe the wall-clock duration of one worker invocation.
pub fn observe_job_duration(status: impl AsRef<str>, duration_secs: f64) {
    tracing::debug!(
        status = %status.as_ref(),
        duration_secs = duration_secs,
        "job duration observed"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::observe_job_duration(status.as_ref(), duration_secs);
}
