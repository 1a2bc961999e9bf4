//! Fan-out delivery of envelopes to registered subscriptions.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::queue::EnqueueError;
use crate::topic::{Subscription, TopicRegistry};

/// Outcome of delivering one envelope across all its subscriptions.
#[derive(Debug, Default, Clone)]
pub struct DeliveryReport {
    /// Handler subscriptions the envelope was handed to.
    pub handlers: usize,
    /// Handler subscriptions whose delivery channel was gone.
    pub handler_failures: usize,
    /// Work queues the envelope was enqueued onto.
    pub enqueued: usize,
    /// Names of work queues that did not admit the envelope.
    pub rejected: Vec<String>,
}

/// Delivers envelopes to every subscription bound to their topic.
///
/// Each subscription gets an independent delivery attempt: a failed or
/// rejected delivery never prevents delivery to the remaining
/// subscriptions. Under `BackpressurePolicy::Block` a full group queue
/// blocks the delivering caller until a worker frees a slot.
pub struct Dispatcher {
    registry: Arc<TopicRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over the given registry.
    pub fn new(registry: Arc<TopicRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver one envelope to every subscription bound to its topic.
    pub fn deliver(&self, envelope: &Envelope) -> DeliveryReport {
        let subscriptions = self.registry.lookup(&envelope.topic);
        let mut report = DeliveryReport::default();

        if subscriptions.is_empty() {
            debug!(
                topic = %envelope.topic,
                sequence = envelope.sequence,
                "no subscribers, envelope dropped"
            );
            return report;
        }

        for subscription in subscriptions {
            match subscription {
                Subscription::Handler { id, tx } => match tx.send(envelope.clone()) {
                    Ok(()) => report.handlers += 1,
                    Err(_) => {
                        warn!(
                            subscription = id,
                            topic = %envelope.topic,
                            sequence = envelope.sequence,
                            "handler thread gone, delivery dropped"
                        );
                        report.handler_failures += 1;
                    }
                },
                Subscription::Group { name, queue } => match queue.enqueue(envelope.clone()) {
                    Ok(()) => report.enqueued += 1,
                    Err(EnqueueError::Full) => {
                        warn!(
                            group = %name,
                            topic = %envelope.topic,
                            sequence = envelope.sequence,
                            "work queue full, envelope rejected"
                        );
                        report.rejected.push(name);
                    }
                    Err(EnqueueError::Closed) => {
                        warn!(
                            group = %name,
                            topic = %envelope.topic,
                            sequence = envelope.sequence,
                            "work queue closed, envelope dropped"
                        );
                        report.rejected.push(name);
                    }
                },
            }
        }

        report
    }
}
