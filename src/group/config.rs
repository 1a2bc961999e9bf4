//! Configuration for a consumer group.

use std::time::Duration;

use crate::queue::BackpressurePolicy;

/// How a stopping worker treats items it has already fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainMode {
    /// Finish processing every fetched item before exiting.
    #[default]
    Graceful,
    /// Exit after the item currently being processed; drop the rest.
    Forced,
}

/// What a worker does with an item whose processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and drop the item.
    #[default]
    Discard,
    /// Retain the failed envelope in the group's dead-letter buffer.
    DeadLetter,
}

/// Configuration for a competing-consumer group.
///
/// ## Example
///
/// ```
/// use relay_rust::{BackpressurePolicy, DrainMode, GroupConfig};
///
/// let config = GroupConfig::new()
///     .workers(4)
///     .prefetch(2)
///     .queue_capacity(64)
///     .backpressure(BackpressurePolicy::Reject)
///     .drain(DrainMode::Graceful);
/// ```
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Number of concurrent workers processing items.
    pub worker_count: usize,
    /// Maximum fetched-but-uncompleted items each worker may hold.
    pub prefetch: usize,
    /// Bound on the group's work queue; `None` means unbounded.
    pub queue_capacity: Option<usize>,
    /// What enqueue does when the queue is full.
    pub backpressure: BackpressurePolicy,
    /// How workers treat already-fetched items on stop.
    pub drain: DrainMode,
    /// What happens to items whose processing fails.
    pub on_failure: FailurePolicy,
    /// How long a worker waits on an empty queue before rechecking its
    /// stop signal.
    pub poll_interval: Duration,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            prefetch: 1,
            queue_capacity: None,
            backpressure: BackpressurePolicy::default(),
            drain: DrainMode::default(),
            on_failure: FailurePolicy::default(),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl GroupConfig {
    /// Default configuration: one worker, one credit, unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers.
    pub fn workers(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the per-worker prefetch credit limit.
    pub fn prefetch(mut self, credits: usize) -> Self {
        self.prefetch = credits;
        self
    }

    /// Bound the work queue to `capacity` items.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set the full-queue behavior.
    pub fn backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.backpressure = policy;
        self
    }

    /// Set the stop-time drain behavior.
    pub fn drain(mut self, mode: DrainMode) -> Self {
        self.drain = mode;
        self
    }

    /// Set the failed-item disposition.
    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Set the empty-queue poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
