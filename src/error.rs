//! Error types for bus operations.

use std::error::Error;
use std::fmt;

/// Error type for publish operations.
///
/// Publishers only see admission outcomes; downstream handler and worker
/// failures are reported through logging and stats, never here.
#[derive(Debug)]
pub enum PublishError {
    /// A bound consumer-group queue was full under the `Reject` policy.
    EnqueueRejected {
        /// Name of the rejecting queue.
        queue: String,
    },
    /// Serialization of the payload failed.
    SerializationFailed(String),
    /// The bus has been stopped and no longer admits messages.
    Closed,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::EnqueueRejected { queue } => {
                write!(f, "queue '{}' is full, enqueue rejected", queue)
            }
            PublishError::SerializationFailed(msg) => {
                write!(f, "serialization failed: {}", msg)
            }
            PublishError::Closed => write!(f, "bus is stopped"),
        }
    }
}

impl Error for PublishError {}

impl From<bitcode::Error> for PublishError {
    fn from(err: bitcode::Error) -> Self {
        PublishError::SerializationFailed(err.to_string())
    }
}

/// Error type for binding consumer groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A consumer group with this name is already bound.
    DuplicateGroupName(String),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::DuplicateGroupName(name) => {
                write!(f, "consumer group '{}' is already bound", name)
            }
        }
    }
}

impl Error for BindError {}

/// Error type returned by subscriber handlers and group processors.
///
/// Caught at the dispatch/worker boundary and reported per subscription;
/// never propagates to the publisher or to other subscribers.
#[derive(Debug)]
pub enum HandlerError {
    /// Payload decode failed.
    DecodeFailed(String),
    /// Business logic rejected the item.
    Rejected(String),
    /// Other error.
    Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
            HandlerError::Rejected(msg) => write!(f, "rejected: {}", msg),
            HandlerError::Other(e) => write!(f, "handler error: {}", e),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<bitcode::Error> for HandlerError {
    fn from(err: bitcode::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}
