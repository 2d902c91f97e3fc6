use thiserror::Error;

/// Configuration errors, rejected synchronously before any job starts.
///
/// These are the only batch-level errors: everything past configuration is
/// per-job, recorded as a [`JobOutcome`](crate::job::JobOutcome) and never
/// propagated as a fatal batch error.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BatchError {
    #[error("concurrency limit must be at least 1, got {0}")]
    InvalidConcurrency(usize),
    #[error("batch contains no jobs")]
    EmptyBatch,
}
