//! Dispatcher - fans a published envelope out to every bound subscriber.
//!
//! Delivery is fan-out, not fan-in: an envelope bound to K subscriptions
//! produces K independent delivery attempts, each succeeding or failing
//! on its own. A handler subscription receives envelopes on a dedicated
//! thread, so one slow or failing subscriber never delays the publisher,
//! a sibling handler, or a consumer group.

mod dispatcher;
mod handler_thread;

pub use dispatcher::{DeliveryReport, Dispatcher};
pub use handler_thread::HandlerStats;
pub(crate) use handler_thread::HandlerThread;
