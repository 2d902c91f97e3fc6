use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;

use crate::job::{BatchId, BatchResult, JobId, JobOutcome};

/// Metadata envelope attached to every batch event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventMeta {
    /// Batch this event belongs to.
    pub batch_id: BatchId,
    /// Timestamp when the event was published.
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    pub fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            timestamp: Utc::now(),
        }
    }
}

/// Which worker stream a forwarded line arrived on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Batch lifecycle event with metadata and payload.
#[derive(Clone, Debug)]
pub struct BatchEvent {
    pub meta: EventMeta,
    pub payload: BatchEventPayload,
}

impl BatchEvent {
    pub fn new(batch_id: BatchId, payload: BatchEventPayload) -> Self {
        Self {
            meta: EventMeta::new(batch_id),
            payload,
        }
    }
}

/// Event payload emitted for batch lifecycle transitions.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum BatchEventPayload {
    /// A worker slot was filled; the job's process is being started.
    /// Emitted in submission order.
    JobStarted { job_id: JobId, source_path: PathBuf },
    /// One line of worker output. Lines from concurrently running jobs
    /// interleave freely; consumers that need per-job contiguity must
    /// filter by `job_id`.
    OutputLine {
        job_id: JobId,
        stream: OutputStream,
        line: String,
    },
    /// The job reached its terminal outcome. Emitted in completion order,
    /// which is not submission order.
    JobCompleted { job_id: JobId, outcome: JobOutcome },
    /// Every submitted job has terminated. Fires exactly once per batch.
    BatchCompleted { result: BatchResult },
}

/// In-process fan-out bus for batch events, backed by a tokio broadcast
/// channel.
///
/// Publish never blocks: all active subscribers receive a clone of each
/// event, and a subscriber that falls further behind than the configured
/// capacity observes `RecvError::Lagged` instead of stalling the driver.
pub struct BatchEventBus {
    sender: broadcast::Sender<BatchEvent>,
    capacity: usize,
}

impl std::fmt::Debug for BatchEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl BatchEventBus {
    /// Create a new event bus buffering up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event to all subscribers.
    ///
    /// Non-blocking; if no subscribers exist the event is silently dropped.
    pub fn publish(&self, event: BatchEvent) -> anyhow::Result<()> {
        let _ = self.sender.send(event);
        Ok(())
    }

    /// Subscribe to batch events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Configured channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Create an output relay that tags lines with the given batch id.
    pub fn relay(&self, batch_id: BatchId) -> OutputRelay {
        OutputRelay {
            batch_id,
            sender: self.sender.clone(),
        }
    }
}

/// Forwards per-job worker output onto the shared event channel.
///
/// One relay serves every slot in a batch; worker adapters call
/// [`OutputRelay::publish`] once per line as it arrives. No ordering is
/// maintained across jobs, only within a single job's stream.
#[derive(Clone, Debug)]
pub struct OutputRelay {
    batch_id: BatchId,
    sender: broadcast::Sender<BatchEvent>,
}

impl OutputRelay {
    /// Forward one line of worker output, tagged by originating job.
    pub fn publish(&self, job_id: JobId, stream: OutputStream, line: impl Into<String>) {
        let _ = self.sender.send(BatchEvent::new(
            self.batch_id,
            BatchEventPayload::OutputLine {
                job_id,
                stream,
                line: line.into(),
            },
        ));
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_fan_out_to_all_subscribers() {
        let bus = BatchEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let batch_id = BatchId::new();
        bus.publish(BatchEvent::new(
            batch_id,
            BatchEventPayload::BatchCompleted {
                result: BatchResult::new(0),
            },
        ))
        .unwrap();

        for rx in [&mut rx1, &mut rx2] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.meta.batch_id, batch_id);
            assert!(matches!(
                event.payload,
                BatchEventPayload::BatchCompleted { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_relay_tags_lines_with_job_and_stream() {
        let bus = BatchEventBus::new(16);
        let mut rx = bus.subscribe();

        let batch_id = BatchId::new();
        let relay = bus.relay(batch_id);
        let job_id = JobId::new();
        relay.publish(job_id, OutputStream::Stderr, "ffmpeg warning");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.meta.batch_id, batch_id);
        match event.payload {
            BatchEventPayload::OutputLine {
                job_id: id,
                stream,
                line,
            } => {
                assert_eq!(id, job_id);
                assert_eq!(stream, OutputStream::Stderr);
                assert_eq!(line, "ffmpeg warning");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = BatchEventBus::new(4);
        let relay = bus.relay(BatchId::new());
        relay.publish(JobId::new(), OutputStream::Stdout, "dropped");
        assert_eq!(bus.subscriber_count(), 0);
    }
}
