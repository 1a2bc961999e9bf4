//! Credit-based worker loop for a consumer group.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::warn;

use crate::envelope::Envelope;
use crate::error::HandlerError;
use crate::group::{DrainMode, FailurePolicy};
use crate::queue::WorkQueue;

pub(crate) type Processor = dyn Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync;

/// Statistics from one worker.
#[derive(Debug, Default, Clone)]
pub(crate) struct WorkerStats {
    pub items_completed: usize,
    pub items_failed: usize,
    pub items_abandoned: usize,
    pub polls: usize,
}

/// Everything one worker needs, shared with its group.
pub(crate) struct WorkerContext {
    pub group: String,
    pub index: usize,
    pub queue: Arc<WorkQueue>,
    pub processor: Arc<Processor>,
    pub prefetch: usize,
    pub drain: DrainMode,
    pub on_failure: FailurePolicy,
    pub poll_interval: Duration,
    pub dead_letters: Arc<Mutex<Vec<Envelope>>>,
    /// This worker's fetched-but-uncompleted count.
    pub in_flight: Arc<AtomicUsize>,
    /// Highest in-flight count this worker ever reached.
    pub high_water: Arc<AtomicUsize>,
}

/// Worker loop: acquire up to `prefetch` credits, dequeue one envelope
/// per credit, process the head, release the credit on completion.
///
/// An envelope counts as in-flight from the moment it is fetched until
/// its processing finishes, so a worker never holds more than `prefetch`
/// items in any state. Only the first fetch of a cycle blocks; top-ups
/// past the first held item are non-blocking so a worker never waits on
/// the queue while it still has work in hand.
pub(crate) fn run(ctx: WorkerContext, stop_rx: Receiver<()>) -> WorkerStats {
    let mut held: VecDeque<Envelope> = VecDeque::new();
    let mut stats = WorkerStats::default();

    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                drain(&ctx, &mut held, &mut stats);
                break;
            }
            Err(TryRecvError::Empty) => {}
        }

        while held.len() < ctx.prefetch {
            let fetched = if held.is_empty() {
                stats.polls += 1;
                ctx.queue.dequeue_timeout(ctx.poll_interval)
            } else {
                ctx.queue.try_dequeue()
            };
            match fetched {
                Some(envelope) => {
                    let now = ctx.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
                    ctx.high_water.fetch_max(now, Ordering::Relaxed);
                    held.push_back(envelope);
                }
                None => break,
            }
        }

        if held.is_empty() && ctx.queue.is_closed() {
            // Queue closed and nothing in hand; no stop signal needed.
            break;
        }

        if let Some(envelope) = held.pop_front() {
            process_one(&ctx, envelope, &mut stats);
        }
    }

    stats
}

fn drain(ctx: &WorkerContext, held: &mut VecDeque<Envelope>, stats: &mut WorkerStats) {
    match ctx.drain {
        DrainMode::Graceful => {
            while let Some(envelope) = held.pop_front() {
                process_one(ctx, envelope, stats);
            }
        }
        DrainMode::Forced => {
            if !held.is_empty() {
                warn!(
                    group = %ctx.group,
                    worker = ctx.index,
                    abandoned = held.len(),
                    "fetched items abandoned on stop"
                );
            }
            stats.items_abandoned += held.len();
            ctx.in_flight.fetch_sub(held.len(), Ordering::Relaxed);
            held.clear();
        }
    }
}

fn process_one(ctx: &WorkerContext, envelope: Envelope, stats: &mut WorkerStats) {
    let outcome = catch_unwind(AssertUnwindSafe(|| (ctx.processor)(&envelope)));
    ctx.in_flight.fetch_sub(1, Ordering::Relaxed);
    match outcome {
        Ok(Ok(())) => stats.items_completed += 1,
        Ok(Err(e)) => {
            warn!(
                group = %ctx.group,
                worker = ctx.index,
                sequence = envelope.sequence,
                error = %e,
                "processing failed"
            );
            record_failure(ctx, envelope, stats);
        }
        Err(_) => {
            warn!(
                group = %ctx.group,
                worker = ctx.index,
                sequence = envelope.sequence,
                "processing panicked"
            );
            record_failure(ctx, envelope, stats);
        }
    }
}

fn record_failure(ctx: &WorkerContext, envelope: Envelope, stats: &mut WorkerStats) {
    stats.items_failed += 1;
    if ctx.on_failure == FailurePolicy::DeadLetter {
        ctx.dead_letters.lock().unwrap().push(envelope);
    }
}
