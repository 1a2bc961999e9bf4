//! Bus - top-level facade composing the registry, dispatcher and
//! consumer groups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::dispatch::{Dispatcher, HandlerStats, HandlerThread};
use crate::envelope::Envelope;
use crate::error::{BindError, HandlerError, PublishError};
use crate::group::{ConsumerGroup, GroupConfig, GroupStats};
use crate::topic::{SubscriptionHandle, TopicRegistry};

const HANDLER_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of stopping the bus.
#[derive(Debug, Default)]
pub struct StopReport {
    /// Per-group statistics; order is not significant.
    pub groups: Vec<(String, GroupStats)>,
    /// Aggregated statistics across all handler subscriptions.
    pub handlers: HandlerStats,
    /// Every worker and handler thread confirmed shutdown in time.
    pub fully_drained: bool,
}

/// In-process message bus: topic fan-out to handler subscribers plus
/// competing-consumer work dispatch through named groups.
///
/// A `Bus` is constructed explicitly and shared by reference (or `Arc`);
/// there is no process-wide instance. The registry and groups live for
/// the bus's lifetime; envelopes live from publish until every bound
/// subscriber (each handler, one worker per group) has finished with
/// them.
///
/// ## Example
///
/// ```
/// use relay_rust::{Bus, GroupConfig};
/// use std::time::Duration;
///
/// let bus = Bus::new();
///
/// bus.subscribe("order.created", |envelope| {
///     let _ = envelope.payload_str();
///     Ok(())
/// });
///
/// bus.bind_consumer_group(
///     "order.created",
///     "billing",
///     GroupConfig::new().workers(2),
///     |envelope| {
///         let _ = envelope.sequence;
///         Ok(())
///     },
/// ).unwrap();
///
/// bus.start();
/// bus.publish("order.created", b"{}".to_vec()).unwrap();
/// let report = bus.stop(Duration::from_secs(1));
/// assert!(report.fully_drained);
/// ```
pub struct Bus {
    registry: Arc<TopicRegistry>,
    dispatcher: Dispatcher,
    groups: Mutex<HashMap<String, Arc<ConsumerGroup>>>,
    handler_threads: Mutex<Vec<HandlerThread>>,
    sequence: AtomicU64,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Bus {
    /// Create an empty bus.
    pub fn new() -> Self {
        let registry = Arc::new(TopicRegistry::new());
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&registry)),
            registry,
            groups: Mutex::new(HashMap::new()),
            handler_threads: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Publish a payload under a topic.
    ///
    /// Wraps the payload in an envelope carrying the next sequence
    /// number and delivers it to every subscription bound to the topic.
    /// Returns the sequence number on admission. If any bound group
    /// queue turned the envelope away, the first such queue is reported
    /// as `EnqueueRejected` — after every other subscription already got
    /// its delivery attempt. Handler outcomes never surface here.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<u64, PublishError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(PublishError::Closed);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let envelope = Envelope::new(sequence, topic, payload);
        let report = self.dispatcher.deliver(&envelope);

        debug!(
            topic,
            sequence,
            handlers = report.handlers,
            enqueued = report.enqueued,
            rejected = report.rejected.len(),
            "published"
        );

        match report.rejected.first() {
            Some(queue) => Err(PublishError::EnqueueRejected {
                queue: queue.clone(),
            }),
            None => Ok(sequence),
        }
    }

    /// Publish a bitcode-serialized payload under a topic.
    pub fn publish_encoded<T: serde::Serialize>(
        &self,
        topic: &str,
        payload: &T,
    ) -> Result<u64, PublishError> {
        let bytes = bitcode::serialize(payload)?;
        self.publish(topic, bytes)
    }

    /// Register a fan-out handler for a topic.
    ///
    /// The handler runs on its own delivery thread; its failures are
    /// logged and counted, never propagated. Subscribing the same
    /// handler twice yields two independent deliveries per publish.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = self.registry.allocate_id();
        let (thread, tx) = HandlerThread::spawn(id, handler, HANDLER_POLL_INTERVAL);
        self.registry.bind_handler(topic, id, tx);
        self.handler_threads.lock().unwrap().push(thread);

        SubscriptionHandle {
            id,
            topic: topic.to_string(),
        }
    }

    /// Create a consumer group and bind its queue to a topic.
    ///
    /// Fails with `DuplicateGroupName` if the name is already taken.
    /// If the bus is already started, the group's workers start
    /// immediately.
    pub fn bind_consumer_group<F>(
        &self,
        topic: &str,
        name: &str,
        config: GroupConfig,
        processor: F,
    ) -> Result<Arc<ConsumerGroup>, BindError>
    where
        F: Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut groups = self.groups.lock().unwrap();
        if groups.contains_key(name) {
            return Err(BindError::DuplicateGroupName(name.to_string()));
        }

        let group = Arc::new(ConsumerGroup::new(name, config, processor));
        self.registry
            .bind_group(topic, name, Arc::clone(group.queue()));
        if self.started.load(Ordering::SeqCst) {
            group.start();
        }
        groups.insert(name.to_string(), Arc::clone(&group));

        Ok(group)
    }

    /// Start every bound consumer group's workers. Idempotent.
    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
        for group in self.groups.lock().unwrap().values() {
            group.start();
        }
        debug!("bus started");
    }

    /// Stop the bus: refuse new publishes, signal every handler thread
    /// and consumer group, and wait up to `timeout` for them to confirm
    /// shutdown.
    ///
    /// Whether already-fetched work items are finished or abandoned is
    /// each group's configured `DrainMode`; handler threads always drain
    /// envelopes already delivered to them. Threads missing the deadline
    /// are left detached.
    pub fn stop(&self, timeout: Duration) -> StopReport {
        self.stopped.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + timeout;

        let handler_threads = std::mem::take(&mut *self.handler_threads.lock().unwrap());
        for thread in &handler_threads {
            thread.signal_stop();
        }

        let groups: Vec<(String, Arc<ConsumerGroup>)> = self
            .groups
            .lock()
            .unwrap()
            .iter()
            .map(|(name, group)| (name.clone(), Arc::clone(group)))
            .collect();

        let mut report = StopReport {
            fully_drained: true,
            ..StopReport::default()
        };

        for (name, group) in groups {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let was_started = group.is_started();
            let stats = group.stop(remaining);
            if was_started && stats.workers_stopped < group.worker_count() {
                report.fully_drained = false;
            }
            report.groups.push((name, stats));
        }

        for thread in &handler_threads {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match thread.wait(remaining) {
                Some(stats) => report.handlers.merge(&stats),
                None => {
                    warn!(
                        subscription = thread.id(),
                        "stop deadline elapsed before handler thread confirmed"
                    );
                    report.fully_drained = false;
                }
            }
        }

        debug!(
            groups = report.groups.len(),
            handled = report.handlers.messages_handled,
            fully_drained = report.fully_drained,
            "bus stopped"
        );
        report
    }

    /// Look up a bound consumer group by name.
    pub fn group(&self, name: &str) -> Option<Arc<ConsumerGroup>> {
        self.groups.lock().unwrap().get(name).cloned()
    }

    /// Number of subscriptions currently bound to a topic.
    pub fn subscription_count(&self, topic: &str) -> usize {
        self.registry.subscription_count(topic)
    }

    /// Sequence number of the most recent publish (0 if none).
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
