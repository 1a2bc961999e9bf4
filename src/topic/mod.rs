//! Topic Registry - maps message topics to the subscribers bound to them.
//!
//! Two kinds of binding exist, mirroring the two delivery paths of the bus:
//!
//! ```text
//!                      ┌──────────────────┐
//!   publish(topic) ──▶ │  Topic Registry  │
//!                      └──────────────────┘
//!                        │              │
//!           Handler      ▼              ▼      Group
//!   (fan-out: every      handler       work queue   (competing consumers:
//!    subscriber gets     thread        of a named    exactly one worker
//!    every envelope)                   group         gets each envelope)
//! ```
//!
//! Binding is additive: binding the same target twice yields two
//! independent subscriptions, hence two deliveries per publish. There is
//! no unbind; subscriptions live for the registry's lifetime.

mod registry;
mod subscription;

pub use registry::TopicRegistry;
pub use subscription::{Subscription, SubscriptionHandle};
