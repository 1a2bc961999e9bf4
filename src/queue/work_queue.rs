//! Bounded FIFO queue of envelopes with blocking and rejecting
//! backpressure.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::envelope::Envelope;
use crate::queue::BackpressurePolicy;

/// Error type for enqueue operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    /// The queue is at capacity and the policy is `Reject`.
    Full,
    /// The queue has been closed and admits no new items.
    Closed,
}

impl fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueError::Full => write!(f, "queue is full"),
            EnqueueError::Closed => write!(f, "queue is closed"),
        }
    }
}

impl Error for EnqueueError {}

struct Inner {
    buffer: VecDeque<Envelope>,
    closed: bool,
}

/// Ordered, bounded-capacity queue of envelopes feeding one consumer group.
///
/// FIFO: items leave in the order their enqueue completed, including under
/// concurrent enqueues from multiple publishers. `capacity: None` means
/// unbounded.
///
/// ## Example
///
/// ```
/// use relay_rust::{BackpressurePolicy, Envelope, WorkQueue};
/// use std::time::Duration;
///
/// let queue = WorkQueue::new("orders", Some(8), BackpressurePolicy::Reject);
///
/// queue.enqueue(Envelope::with_string_payload(1, "order.created", "{}")).unwrap();
///
/// let item = queue.dequeue_timeout(Duration::from_millis(10));
/// assert_eq!(item.unwrap().sequence, 1);
/// ```
pub struct WorkQueue {
    name: String,
    capacity: Option<usize>,
    policy: BackpressurePolicy,
    inner: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl WorkQueue {
    /// Create a new queue. `capacity: None` means unbounded.
    pub fn new(
        name: impl Into<String>,
        capacity: Option<usize>,
        policy: BackpressurePolicy,
    ) -> Self {
        Self {
            name: name.into(),
            capacity,
            policy,
            inner: Mutex::new(Inner {
                buffer: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Append an envelope to the tail.
    ///
    /// At capacity, `Block` waits until a worker frees a slot; `Reject`
    /// fails with `EnqueueError::Full`. A closed queue always fails with
    /// `EnqueueError::Closed`.
    pub fn enqueue(&self, envelope: Envelope) -> Result<(), EnqueueError> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.closed {
                return Err(EnqueueError::Closed);
            }
            match self.capacity {
                Some(cap) if inner.buffer.len() >= cap => match self.policy {
                    BackpressurePolicy::Reject => return Err(EnqueueError::Full),
                    BackpressurePolicy::Block => {
                        inner = self.not_full.wait(inner).unwrap();
                    }
                },
                _ => break,
            }
        }
        inner.buffer.push_back(envelope);
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove and return the head, blocking up to `timeout` while the
    /// queue is empty.
    ///
    /// Returns `None` on timeout or once the queue is closed; a closed
    /// queue admits no new dequeues even if items remain buffered.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<Envelope> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.closed {
                return None;
            }
            if let Some(envelope) = inner.buffer.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Some(envelope);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, result) = self.not_empty.wait_timeout(inner, remaining).unwrap();
            inner = guard;
            if result.timed_out() && inner.buffer.is_empty() {
                return None;
            }
        }
    }

    /// Remove and return the head without blocking.
    pub fn try_dequeue(&self) -> Option<Envelope> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return None;
        }
        let envelope = inner.buffer.pop_front()?;
        drop(inner);
        self.not_full.notify_one();
        Some(envelope)
    }

    /// Close the queue: no new enqueues or dequeues are admitted, and all
    /// blocked parties wake up.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buffer.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().buffer.is_empty()
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured capacity bound, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
