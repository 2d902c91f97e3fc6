use std::collections::VecDeque;

use crate::job::JobDescriptor;

/// Ordered backlog of jobs waiting for a worker slot.
///
/// Strictly FIFO: descriptors come back out in the order the caller
/// submitted them, with no deduplication and no reordering. The queue
/// carries no locking of its own; the pool driver owns it outright and is
/// the only accessor, so all access is already serialized.
#[derive(Debug, Default)]
pub struct JobQueue {
    pending: VecDeque<JobDescriptor>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Append descriptors in caller-supplied order.
    pub fn enqueue_all(&mut self, descriptors: impl IntoIterator<Item = JobDescriptor>) {
        self.pending.extend(descriptors);
    }

    /// Remove and return the head of the queue, or `None` when empty.
    pub fn pop_next(&mut self) -> Option<JobDescriptor> {
        self.pending.pop_front()
    }

    /// Number of jobs still waiting for a slot.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
