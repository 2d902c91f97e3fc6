use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::events::{BatchEvent, BatchEventBus, BatchEventPayload};
use crate::invoker::WorkerInvoker;
use crate::job::{BatchId, BatchResult, JobDescriptor, JobId, JobOutcome};
use crate::queue::JobQueue;
use crate::telemetry;

use super::cancel::CancelToken;

/// Mutable orchestration state for one running batch.
///
/// Owned exclusively by the driver loop; no other task reads or writes it,
/// which is what makes the increment-and-check completion step atomic
/// without locks. Invariants: `active` never exceeds the concurrency
/// limit, `completed` never exceeds `total`, and the batch is done iff
/// `completed == total`.
#[derive(Debug)]
struct PoolState {
    total: usize,
    active: usize,
    completed: usize,
}

/// Bounded-concurrency pool driver for one batch of transcription jobs.
///
/// Runs at most `concurrency` worker invocations at a time. Slots report
/// terminal outcomes over a single mpsc channel consumed by the driver
/// loop, and each consumed outcome admits at most one queued job, so the
/// limit is enforced structurally rather than by polling. Jobs start in
/// submission order and may finish in any order; a failing job never
/// blocks or cancels the rest of the batch.
///
/// Progress is observable through the injected [`BatchEventBus`]: per-job
/// start and completion events, forwarded worker output lines, and exactly
/// one `BatchCompleted` event once every job has terminated.
pub struct BatchOrchestrator<I>
where
    I: WorkerInvoker + 'static,
{
    config: BatchConfig,
    invoker: Arc<I>,
    events: Arc<BatchEventBus>,
    cancel: CancelToken,
}

impl<I> fmt::Debug for BatchOrchestrator<I>
where
    I: WorkerInvoker + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("config", &self.config)
            .field("invoker_type", &type_name::<I>())
            .field("subscribers", &self.events.subscriber_count())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl<I> BatchOrchestrator<I>
where
    I: WorkerInvoker + 'static,
{
    /// Create an orchestrator with the given components.
    pub fn new(
        config: BatchConfig,
        invoker: Arc<I>,
        events: Arc<BatchEventBus>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config,
            invoker,
            events,
            cancel,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Get a clone of the event bus.
    pub fn events(&self) -> Arc<BatchEventBus> {
        Arc::clone(&self.events)
    }

    /// Subscribe to batch events.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }

    /// Get a clone of the cancellation token for this orchestrator.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run one batch to completion.
    ///
    /// Validates the configuration synchronously: a concurrency limit
    /// below 1 or an empty job list is rejected before anything spawns and
    /// before any event fires. Past validation the call only resolves once
    /// every job has a terminal outcome; the returned [`BatchResult`]
    /// matches the `BatchCompleted` event published on the bus.
    pub async fn run(&self, descriptors: Vec<JobDescriptor>) -> Result<BatchResult, BatchError> {
        if self.config.concurrency < 1 {
            return Err(BatchError::InvalidConcurrency(self.config.concurrency));
        }
        if descriptors.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let batch_id = BatchId::new();
        let span = telemetry::batch_span(
            batch_id.to_string(),
            descriptors.len(),
            self.config.concurrency,
        );
        Ok(self.drive(batch_id, descriptors).instrument(span).await)
    }

    async fn drive(&self, batch_id: BatchId, descriptors: Vec<JobDescriptor>) -> BatchResult {
        let total = descriptors.len();
        tracing::info!(
            %batch_id,
            total,
            concurrency = self.config.concurrency,
            "batch submitted"
        );

        let mut queue = JobQueue::new();
        queue.enqueue_all(descriptors);

        // Every slot sends exactly one outcome, so `total` never blocks a
        // sender even if the driver lags.
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<(JobId, JobOutcome)>(total);

        let mut state = PoolState {
            total,
            active: 0,
            completed: 0,
        };
        let mut result = BatchResult::new(total);

        // Initial fill: min(concurrency, queue length) slots, in order.
        while state.active < self.config.concurrency {
            let Some(descriptor) = queue.pop_next() else {
                break;
            };
            self.start_slot(batch_id, descriptor, outcome_tx.clone());
            state.active += 1;
        }
        telemetry::set_active_jobs(state.active);

        while state.completed < state.total {
            let Some((job_id, outcome)) = outcome_rx.recv().await else {
                // Each slot holds a sender and sends exactly once; the
                // channel only closes early if a slot task panicked.
                tracing::error!(%batch_id, "outcome channel closed before batch completion");
                break;
            };

            state.active -= 1;
            state.completed += 1;
            telemetry::record_job_completed(job_id.to_string(), outcome.status_label());
            result.record(&outcome);
            let _ = self.events.publish(BatchEvent::new(
                batch_id,
                BatchEventPayload::JobCompleted { job_id, outcome },
            ));

            if self.cancel.is_cancelled() {
                // Stop admitting; queued jobs terminate without starting so
                // the batch still converges on completed == total.
                while let Some(skipped) = queue.pop_next() {
                    let outcome = JobOutcome::Failed {
                        reason: "cancelled before start".to_string(),
                    };
                    state.completed += 1;
                    telemetry::record_job_completed(
                        skipped.id.to_string(),
                        outcome.status_label(),
                    );
                    result.record(&outcome);
                    let _ = self.events.publish(BatchEvent::new(
                        batch_id,
                        BatchEventPayload::JobCompleted {
                            job_id: skipped.id,
                            outcome,
                        },
                    ));
                }
            } else if let Some(descriptor) = queue.pop_next() {
                // One terminal event admits at most one new start.
                self.start_slot(batch_id, descriptor, outcome_tx.clone());
                state.active += 1;
            }

            debug_assert!(state.active <= self.config.concurrency);
            debug_assert!(state.completed <= state.total);
            telemetry::set_active_jobs(state.active);
        }

        let _ = self.events.publish(BatchEvent::new(
            batch_id,
            BatchEventPayload::BatchCompleted {
                result: result.clone(),
            },
        ));
        telemetry::record_batch_completed(batch_id.to_string(), result.succeeded, result.failed);
        result
    }

    /// Fill one worker slot with the next queued job.
    ///
    /// The `JobStarted` event is published here, on the driver task, so
    /// start events observe submission order even though the invocations
    /// themselves run concurrently.
    fn start_slot(
        &self,
        batch_id: BatchId,
        descriptor: JobDescriptor,
        outcome_tx: mpsc::Sender<(JobId, JobOutcome)>,
    ) {
        let job_id = descriptor.id;
        let _ = self.events.publish(BatchEvent::new(
            batch_id,
            BatchEventPayload::JobStarted {
                job_id,
                source_path: descriptor.source_path.clone(),
            },
        ));
        telemetry::record_job_started(job_id.to_string());

        let invoker = Arc::clone(&self.invoker);
        let relay = self.events.relay(batch_id);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let started = std::time::Instant::now();
            let span = telemetry::job_dispatch_span(
                job_id.to_string(),
                descriptor.source_path.display().to_string(),
            );
            let outcome = invoker
                .invoke(&descriptor, &relay, &cancel)
                .instrument(span)
                .await;
            telemetry::observe_job_duration(
                outcome.status_label(),
                started.elapsed().as_secs_f64(),
            );
            if outcome_tx.send((job_id, outcome)).await.is_err() {
                tracing::warn!(%job_id, "driver dropped before outcome delivery");
            }
        });
    }
}
