//! Beluga - Bounded-concurrency batch orchestration for transcription workers.
//!
//! A crate for running a batch of video transcription jobs through opaque
//! external worker processes, at most a configured number at a time, with
//! streamed worker output and per-job outcome reporting.
//!
//! # Core Concepts
//!
//! - **Job**: One video to transcribe. A [`JobDescriptor`] names the source
//!   video, the subtitle output path, and the [`WorkerOptions`] forwarded to
//!   the worker process.
//!
//! - **Invoker**: The [`WorkerInvoker`] trait abstracts worker execution.
//!   [`ProcessWorkerInvoker`] spawns one external process per job and
//!   classifies its exit into a [`JobOutcome`].
//!
//! - **Events**: The [`BatchEventBus`] broadcasts [`BatchEvent`]s as the
//!   batch progresses: job starts, forwarded output lines, per-job
//!   completions, and exactly one batch completion.
//!
//! - **Runtime**: The [`runtime::BatchOrchestrator`] ties the components
//!   together, enforcing the concurrency limit and FIFO start order while
//!   tolerating individual job failures.
//!
//! # Feature Flags
//!
//! - `metrics` - Prometheus metrics support
//!
//! # Example
//!
//! ```ignore
//! use beluga::*;
//! use beluga::runtime::BatchOrchestratorBuilder;
//! use std::sync::Arc;
//!
//! let invoker = ProcessWorkerInvoker::new(ProcessInvokerConfig::new(
//!     "python3",
//!     "transcribe_video.py",
//! ));
//! let orchestrator = BatchOrchestratorBuilder::new(BatchConfig::new(2))
//!     .with_invoker(Arc::new(invoker))
//!     .build()?;
//!
//! let jobs = vec![JobDescriptor::new(
//!     "/videos/talk.mp4",
//!     "/subs/talk.srt",
//!     WorkerOptions::default(),
//! )];
//! let result = orchestrator.run(jobs).await?;
//! ```

/// Batch configuration.
///
/// The `config` module defines [`BatchConfig`] for tuning the concurrency
/// limit and the event bus capacity.
pub mod config;

/// Batch validation errors.
///
/// The `error` module defines [`BatchError`], returned when a batch is
/// rejected before any job starts.
pub mod error;

/// Event publishing and subscription system.
///
/// The `events` module provides the types for batch lifecycle events:
/// - [`BatchEvent`] and [`BatchEventPayload`] for event data
/// - [`BatchEventBus`] for in-process event broadcasting
/// - [`OutputRelay`] for forwarding worker output lines
/// - [`OutputStream`] tagging lines as stdout or stderr
pub mod events;

/// Worker invocation.
///
/// The `invoker` module defines the [`WorkerInvoker`] trait and the
/// [`ProcessWorkerInvoker`] implementation that spawns one external
/// process per job, plus the output marker parsing shared with tests.
pub mod invoker;

/// Core job definitions.
///
/// The `job` module defines the fundamental batch data types:
/// - [`JobDescriptor`] - one unit of work
/// - [`WorkerOptions`] - model, task, and language forwarded to the worker
/// - [`TaskKind`] - transcribe or translate
/// - [`JobOutcome`] - terminal result of one job
/// - [`BatchResult`] - aggregate tallies for one batch
/// - [`JobId`] and [`BatchId`] - unique identifiers
pub mod job;

/// Pending job queue.
///
/// The `queue` module provides [`JobQueue`], the FIFO of jobs waiting for
/// a worker slot.
pub mod queue;

/// Runtime orchestration.
///
/// The `runtime` module provides the batch driver and its supporting
/// pieces:
/// - [`runtime::BatchOrchestrator`] - the pool driver
/// - [`runtime::BatchOrchestratorBuilder`] - dependency wiring
/// - [`runtime::CancelToken`] - batch cancellation signaling
pub mod runtime;

/// Tracing spans and lifecycle recording.
pub mod telemetry;

#[cfg(feature = "metrics")]
/// Prometheus metrics, behind the `metrics` feature.
pub mod metrics;

pub use config::*;
pub use error::*;
pub use events::*;
pub use invoker::*;
pub use job::*;
pub use queue::*;
