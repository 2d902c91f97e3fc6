use serde::{Deserialize, Serialize};

/// Configuration for one batch run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of jobs permitted to run simultaneously. Must be at
    /// least 1; lower values are rejected before any job starts.
    pub concurrency: usize,
    /// Buffer capacity of the batch event channel. A subscriber that falls
    /// further behind than this observes lagged receives.
    pub event_capacity: usize,
}

impl BatchConfig {
    /// Create a configuration with the given concurrency limit.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            event_capacity: 256,
        }
    }

    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(1)
    }
}
