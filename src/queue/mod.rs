//! Work Queue - bounded FIFO channel feeding a consumer group.
//!
//! A `WorkQueue` is the competing-consumer side of the bus: multiple
//! enqueuers append to the tail, a fixed pool of workers removes from the
//! head, and each item leaves the queue exactly once.
//!
//! ```text
//! publisher ──enqueue──▶ ┌───────────────────┐ ──dequeue──▶ worker 1
//! publisher ──enqueue──▶ │  e5 e4 e3 e2 e1   │ ──dequeue──▶ worker 2
//!                        └───────────────────┘ ──dequeue──▶ worker N
//!                          len() <= capacity
//! ```
//!
//! When the queue is at capacity the configured `BackpressurePolicy`
//! decides whether enqueuers block until space frees up or fail
//! immediately.

mod policy;
mod work_queue;

pub use policy::BackpressurePolicy;
pub use work_queue::{EnqueueError, WorkQueue};
