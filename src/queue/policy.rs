//! Backpressure policy for bounded queues.

/// Behavior when a bounded work queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackpressurePolicy {
    /// Block the enqueuing caller until space frees up.
    #[default]
    Block,
    /// Fail the enqueue immediately.
    Reject,
}
