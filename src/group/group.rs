//! A named pool of competing consumers bound to one work queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::error::HandlerError;
use crate::group::worker::{self, Processor, WorkerContext, WorkerStats};
use crate::group::GroupConfig;
use crate::queue::WorkQueue;

/// Statistics collected from a consumer group at stop time.
#[derive(Debug, Default, Clone)]
pub struct GroupStats {
    /// Items processed to completion.
    pub items_completed: usize,
    /// Items whose processing returned an error or panicked.
    pub items_failed: usize,
    /// Fetched items dropped by a forced drain.
    pub items_abandoned: usize,
    /// Blocking poll cycles across all workers.
    pub polls: usize,
    /// Workers that confirmed shutdown before the stop deadline.
    pub workers_stopped: usize,
}

impl GroupStats {
    fn absorb(&mut self, worker: &WorkerStats) {
        self.items_completed += worker.items_completed;
        self.items_failed += worker.items_failed;
        self.items_abandoned += worker.items_abandoned;
        self.polls += worker.polls;
        self.workers_stopped += 1;
    }
}

struct RunState {
    started: bool,
    stopped: bool,
    stop_txs: Vec<Sender<()>>,
    done_rx: Option<Receiver<WorkerStats>>,
}

/// A named pool of `worker_count` concurrent workers draining one
/// work queue, each limited to `prefetch` in-flight items.
///
/// The group owns its queue; envelopes reach it through the dispatcher
/// (topic binding) or by enqueuing on `queue()` directly. Workers are
/// spawned by `start()` and wound down by `stop(timeout)`, which returns
/// the group's accumulated statistics.
///
/// ## Example
///
/// ```
/// use relay_rust::{ConsumerGroup, Envelope, GroupConfig};
/// use std::time::Duration;
///
/// let group = ConsumerGroup::new(
///     "resize-images",
///     GroupConfig::new().workers(2).prefetch(1),
///     |envelope| {
///         // process the payload
///         let _ = envelope.payload_str();
///         Ok(())
///     },
/// );
///
/// group.start();
/// group.queue().enqueue(Envelope::with_string_payload(1, "work", "a.png")).unwrap();
/// let stats = group.stop(Duration::from_secs(1));
/// assert_eq!(stats.workers_stopped, 2);
/// ```
pub struct ConsumerGroup {
    name: String,
    config: GroupConfig,
    queue: Arc<WorkQueue>,
    processor: Arc<Processor>,
    dead_letters: Arc<Mutex<Vec<Envelope>>>,
    in_flight: Vec<Arc<AtomicUsize>>,
    high_water: Vec<Arc<AtomicUsize>>,
    run: Mutex<RunState>,
}

impl std::fmt::Debug for ConsumerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerGroup")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConsumerGroup {
    /// Create a group with the given configuration and processing
    /// callback. Workers do not run until `start()`.
    ///
    /// `worker_count` and `prefetch` are clamped to at least 1.
    pub fn new<F>(name: impl Into<String>, config: GroupConfig, processor: F) -> Self
    where
        F: Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut config = config;
        config.worker_count = config.worker_count.max(1);
        config.prefetch = config.prefetch.max(1);

        let queue = Arc::new(WorkQueue::new(
            name.clone(),
            config.queue_capacity,
            config.backpressure,
        ));
        let in_flight = (0..config.worker_count)
            .map(|_| Arc::new(AtomicUsize::new(0)))
            .collect();
        let high_water = (0..config.worker_count)
            .map(|_| Arc::new(AtomicUsize::new(0)))
            .collect();

        Self {
            name,
            config,
            queue,
            processor: Arc::new(processor),
            dead_letters: Arc::new(Mutex::new(Vec::new())),
            in_flight,
            high_water,
            run: Mutex::new(RunState {
                started: false,
                stopped: false,
                stop_txs: Vec::new(),
                done_rx: None,
            }),
        }
    }

    /// Spawn the group's workers. Idempotent.
    pub fn start(&self) {
        let mut run = self.run.lock().unwrap();
        if run.started {
            return;
        }
        run.started = true;

        let (done_tx, done_rx) = channel();
        run.done_rx = Some(done_rx);

        for index in 0..self.config.worker_count {
            let (stop_tx, stop_rx) = channel();
            run.stop_txs.push(stop_tx);

            let ctx = WorkerContext {
                group: self.name.clone(),
                index,
                queue: Arc::clone(&self.queue),
                processor: Arc::clone(&self.processor),
                prefetch: self.config.prefetch,
                drain: self.config.drain,
                on_failure: self.config.on_failure,
                poll_interval: self.config.poll_interval,
                dead_letters: Arc::clone(&self.dead_letters),
                in_flight: Arc::clone(&self.in_flight[index]),
                high_water: Arc::clone(&self.high_water[index]),
            };
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                let stats = worker::run(ctx, stop_rx);
                let _ = done_tx.send(stats);
            });
        }

        debug!(
            group = %self.name,
            workers = self.config.worker_count,
            prefetch = self.config.prefetch,
            "consumer group started"
        );
    }

    /// Close the queue, signal every worker, and wait up to `timeout`
    /// for them to confirm shutdown.
    ///
    /// Already-fetched items are finished or abandoned according to the
    /// configured `DrainMode`. Workers missing the deadline are left
    /// detached (never killed mid-item); `workers_stopped` in the
    /// returned stats says how many confirmed in time.
    pub fn stop(&self, timeout: Duration) -> GroupStats {
        self.queue.close();

        let (stop_txs, done_rx) = {
            let mut run = self.run.lock().unwrap();
            if !run.started || run.stopped {
                return GroupStats::default();
            }
            run.stopped = true;
            (std::mem::take(&mut run.stop_txs), run.done_rx.take())
        };

        for stop_tx in &stop_txs {
            let _ = stop_tx.send(());
        }

        let deadline = Instant::now() + timeout;
        let mut stats = GroupStats::default();
        if let Some(done_rx) = done_rx {
            for _ in 0..stop_txs.len() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match done_rx.recv_timeout(remaining) {
                    Ok(worker_stats) => stats.absorb(&worker_stats),
                    Err(_) => break,
                }
            }
        }

        if stats.workers_stopped < stop_txs.len() {
            warn!(
                group = %self.name,
                stopped = stats.workers_stopped,
                expected = stop_txs.len(),
                "stop deadline elapsed before all workers confirmed"
            );
        }

        stats
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the group's workers have been spawned.
    pub fn is_started(&self) -> bool {
        self.run.lock().unwrap().started
    }

    /// The group's work queue.
    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Per-worker prefetch credit limit.
    pub fn prefetch(&self) -> usize {
        self.config.prefetch
    }

    /// Current fetched-but-uncompleted count per worker.
    pub fn in_flight(&self) -> Vec<usize> {
        self.in_flight
            .iter()
            .map(|gauge| gauge.load(Ordering::Relaxed))
            .collect()
    }

    /// Highest in-flight count each worker ever reached.
    pub fn high_water_marks(&self) -> Vec<usize> {
        self.high_water
            .iter()
            .map(|gauge| gauge.load(Ordering::Relaxed))
            .collect()
    }

    /// Envelopes retained under `FailurePolicy::DeadLetter`.
    pub fn dead_letters(&self) -> Vec<Envelope> {
        self.dead_letters.lock().unwrap().clone()
    }
}

impl Drop for ConsumerGroup {
    fn drop(&mut self) {
        self.queue.close();
        let run = self.run.lock().unwrap();
        for stop_tx in &run.stop_txs {
            let _ = stop_tx.send(());
        }
    }
}
