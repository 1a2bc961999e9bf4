//! Subscription - a single binding of a topic to a delivery target.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::envelope::Envelope;
use crate::queue::WorkQueue;

/// A single binding of a topic to a delivery target.
#[derive(Clone)]
pub enum Subscription {
    /// Deliver by handing the envelope to a subscriber's handler thread.
    Handler {
        /// Registration id, unique per registry.
        id: u64,
        /// Channel into the handler thread's delivery loop.
        tx: Sender<Envelope>,
    },
    /// Deliver by enqueuing onto a consumer group's work queue.
    Group {
        /// Consumer group name.
        name: String,
        /// The group's work queue.
        queue: Arc<WorkQueue>,
    },
}

/// Handle identifying a handler registration.
///
/// Returned from `Bus::subscribe`; carries enough to address the
/// registration later (e.g. for a future unbind operation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    /// Registration id, unique per registry.
    pub id: u64,
    /// Topic the handler is bound to.
    pub topic: String,
}
