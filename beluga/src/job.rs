use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for one transcription job.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one submitted batch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the worker is asked to do with the recognized speech.
///
/// Passed to the worker as its `--task` flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Emit subtitles in the spoken language.
    Transcribe,
    /// Translate the speech to English while transcribing.
    Translate,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Transcribe => "transcribe",
            TaskKind::Translate => "translate",
        }
    }
}

impl Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration bundle handed to the worker as discrete flags.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerOptions {
    /// Speech model name (`--model`).
    pub model: String,
    /// Task to perform (`--task`).
    pub task: TaskKind,
    /// Language hint (`--language`). `None` or blank lets the worker
    /// auto-detect; blank values are not forwarded.
    pub language: Option<String>,
}

impl WorkerOptions {
    /// Create options for the given model with task `Transcribe` and
    /// auto-detected language.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            task: TaskKind::Transcribe,
            language: None,
        }
    }

    /// Set the task kind.
    pub fn with_task(mut self, task: TaskKind) -> Self {
        self.task = task;
        self
    }

    /// Set the language hint.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self::new("base")
    }
}

/// One unit of work: a single input file mapped to one worker invocation.
///
/// Immutable once enqueued; consumed from the queue when a worker slot
/// becomes available.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Unique job identifier, assigned at construction.
    pub id: JobId,
    /// Input media file handed to the worker.
    pub source_path: PathBuf,
    /// Predicted subtitle output path. The worker may announce a different
    /// path on its marker line, which then takes precedence.
    pub output_path: PathBuf,
    /// Worker configuration flags.
    pub options: WorkerOptions,
}

impl JobDescriptor {
    pub fn new(
        source_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        options: WorkerOptions,
    ) -> Self {
        Self {
            id: JobId::new(),
            source_path: source_path.into(),
            output_path: output_path.into(),
            options,
        }
    }
}

/// Terminal result of one job, produced exactly once by the worker adapter.
///
/// The three variants are mutually exclusive and exhaustive: a job either
/// ran and exited cleanly, ran and did not, or never started. Reasons are
/// free-text diagnostics since the worker reports no structured errors.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// Worker exited with status 0. The path is the one announced on the
    /// worker's marker line when present, otherwise the descriptor's
    /// predicted output path.
    Succeeded { output_path: PathBuf },
    /// Worker ran but did not succeed: nonzero exit, timeout, or kill.
    Failed { reason: String },
    /// The worker process could not be started at all.
    LaunchFailed { reason: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }

    /// Stable label for logs and metrics.
    pub fn status_label(&self) -> &'static str {
        match self {
            JobOutcome::Succeeded { .. } => "succeeded",
            JobOutcome::Failed { .. } => "failed",
            JobOutcome::LaunchFailed { .. } => "launch_failed",
        }
    }
}

/// Aggregate summary delivered once per batch, when every job has
/// terminated.
///
/// Invariant on finalization: `succeeded + failed == total`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Number of jobs submitted.
    pub total: usize,
    /// Jobs that reached [`JobOutcome::Succeeded`].
    pub succeeded: usize,
    /// Jobs that failed or never launched.
    pub failed: usize,
}

impl BatchResult {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: 0,
        }
    }

    /// Tally one terminal outcome.
    pub fn record(&mut self, outcome: &JobOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Number of jobs that have reached a terminal outcome.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// True once every submitted job has terminated.
    pub fn is_complete(&self) -> bool {
        self.completed() == self.total
    }
}
