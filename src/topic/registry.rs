//! Registry of topic-to-subscription bindings.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::envelope::Envelope;
use crate::queue::WorkQueue;
use crate::topic::Subscription;

/// Maps each topic to the set of subscriptions currently bound to it.
///
/// Bindings are created at subscribe/bind time and live for the
/// registry's lifetime. Lookup returns a cloned snapshot so delivery
/// never holds the registry lock.
pub struct TopicRegistry {
    bindings: RwLock<HashMap<String, Vec<Subscription>>>,
    next_id: AtomicU64,
}

impl TopicRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a registration id for a handler subscription.
    pub fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Bind a handler delivery channel to a topic.
    pub fn bind_handler(&self, topic: &str, id: u64, tx: Sender<Envelope>) {
        let mut bindings = self.bindings.write().unwrap();
        bindings
            .entry(topic.to_string())
            .or_default()
            .push(Subscription::Handler { id, tx });
        debug!(topic, subscription = id, "handler bound");
    }

    /// Bind a consumer group's work queue to a topic.
    pub fn bind_group(&self, topic: &str, name: &str, queue: Arc<WorkQueue>) {
        let mut bindings = self.bindings.write().unwrap();
        bindings
            .entry(topic.to_string())
            .or_default()
            .push(Subscription::Group {
                name: name.to_string(),
                queue,
            });
        debug!(topic, group = name, "consumer group bound");
    }

    /// All current subscriptions for a topic; empty if none.
    pub fn lookup(&self, topic: &str) -> Vec<Subscription> {
        self.bindings
            .read()
            .unwrap()
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of subscriptions bound to a topic.
    pub fn subscription_count(&self, topic: &str) -> usize {
        self.bindings
            .read()
            .unwrap()
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Topics that have at least one subscription.
    pub fn topics(&self) -> Vec<String> {
        self.bindings.read().unwrap().keys().cloned().collect()
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}
