//! Consumer Group - a named pool of workers competing over one work queue.
//!
//! Each group owns a `WorkQueue` and `worker_count` worker threads. A
//! worker holds up to `prefetch` fetched-but-uncompleted envelopes at a
//! time (its credits); every envelope is processed by exactly one worker.
//!
//! ```text
//!                         ┌─────────────────────────────┐
//!   enqueue ────────────▶ │  work queue (FIFO, bounded) │
//!                         └─────────────────────────────┘
//!                            │          │          │
//!                            ▼          ▼          ▼
//!                        worker 0   worker 1  ... worker N-1
//!                        credits≤M  credits≤M     credits≤M
//! ```
//!
//! `worker_count` bounds parallel processing across the group; `prefetch`
//! bounds each worker's look-ahead. A slow item affects only the worker
//! holding it.

mod config;
mod group;
mod worker;

pub use config::{DrainMode, FailurePolicy, GroupConfig};
pub use group::{ConsumerGroup, GroupStats};
