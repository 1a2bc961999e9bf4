mod bus;
mod dispatch;
mod envelope;
mod error;
mod group;
mod queue;
mod topic;

pub use bus::{Bus, StopReport};
pub use dispatch::{DeliveryReport, Dispatcher, HandlerStats};
pub use envelope::Envelope;
pub use error::{BindError, HandlerError, PublishError};
pub use group::{ConsumerGroup, DrainMode, FailurePolicy, GroupConfig, GroupStats};
pub use queue::{BackpressurePolicy, EnqueueError, WorkQueue};
pub use topic::{Subscription, SubscriptionHandle, TopicRegistry};
