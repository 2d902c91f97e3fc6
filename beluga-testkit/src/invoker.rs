use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beluga::runtime::CancelToken;
use beluga::{JobDescriptor, JobId, JobOutcome, OutputRelay, OutputStream, WorkerInvoker};

/// Scripted behavior for one job in a [`ScriptedInvoker`].
#[derive(Clone, Debug)]
pub struct ScriptedBehavior {
    /// Simulated worker run time before the outcome is reported.
    pub delay: Duration,
    /// Stdout lines published through the relay before completion.
    pub lines: Vec<String>,
    /// Terminal outcome to report.
    pub outcome: JobOutcome,
}

impl ScriptedBehavior {
    /// Succeed, reporting the given output path.
    pub fn success(output_path: impl Into<PathBuf>) -> Self {
        Self {
            delay: Duration::ZERO,
            lines: Vec::new(),
            outcome: JobOutcome::Succeeded {
                output_path: output_path.into(),
            },
        }
    }

    /// Fail with the given reason.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            lines: Vec::new(),
            outcome: JobOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    /// Fail to launch with the given reason.
    pub fn launch_failure(reason: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            lines: Vec::new(),
            outcome: JobOutcome::LaunchFailed {
                reason: reason.into(),
            },
        }
    }

    /// Set the simulated run time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the stdout lines published before completion.
    pub fn with_lines(mut self, lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.lines = lines.into_iter().map(Into::into).collect();
        self
    }
}

/// One recorded invocation, in the order the invoker observed them.
#[derive(Clone, Debug)]
pub struct InvocationRecord {
    pub job_id: JobId,
    pub source_path: PathBuf,
}

/// In-process [`WorkerInvoker`] that follows per-job scripts instead of
/// spawning processes.
///
/// Behaviors are keyed by the descriptor's source path; jobs without a
/// script fall back to the default behavior (immediate success reporting
/// the descriptor's output path). The invoker records every invocation and
/// tracks the high-water mark of concurrently running invocations, which
/// is how concurrency-limit tests observe the pool from outside.
#[derive(Clone)]
pub struct ScriptedInvoker {
    behaviors: Arc<Mutex<HashMap<PathBuf, ScriptedBehavior>>>,
    invocations: Arc<Mutex<Vec<InvocationRecord>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self {
            behaviors: Arc::new(Mutex::new(HashMap::new())),
            invocations: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script the behavior for the job with the given source path.
    pub fn script(&self, source_path: impl Into<PathBuf>, behavior: ScriptedBehavior) {
        self.behaviors.lock().insert(source_path.into(), behavior);
    }

    /// Invocations observed so far, in start order.
    pub fn invocations(&self) -> Vec<InvocationRecord> {
        self.invocations.lock().clone()
    }

    pub fn assert_invocation_count_eq(&self, expected: usize) {
        let actual = self.invocations.lock().len();
        assert_eq!(
            actual, expected,
            "Expected {} invocations, got {}",
            expected, actual
        );
    }

    /// Highest number of invocations that were in flight at the same time.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.invocations.lock().clear();
        self.active.store(0, Ordering::SeqCst);
        self.max_active.store(0, Ordering::SeqCst);
    }

    fn behavior_for(&self, descriptor: &JobDescriptor) -> ScriptedBehavior {
        self.behaviors
            .lock()
            .get(&descriptor.source_path)
            .cloned()
            .unwrap_or_else(|| ScriptedBehavior::success(descriptor.output_path.clone()))
    }
}

impl Default for ScriptedInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerInvoker for ScriptedInvoker {
    async fn invoke(
        &self,
        descriptor: &JobDescriptor,
        relay: &OutputRelay,
        cancel: &CancelToken,
    ) -> JobOutcome {
        self.invocations.lock().push(InvocationRecord {
            job_id: descriptor.id,
            source_path: descriptor.source_path.clone(),
        });

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let behavior = self.behavior_for(descriptor);
        for line in &behavior.lines {
            relay.publish(descriptor.id, OutputStream::Stdout, line.clone());
        }

        let outcome = tokio::select! {
            _ = tokio::time::sleep(behavior.delay) => behavior.outcome,
            _ = cancel.cancelled() => JobOutcome::Failed {
                reason: "cancelled".to_string(),
            },
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
