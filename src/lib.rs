// burstq - In-process bounded-concurrency priority work queue
// Smooths bursts of outbound work against rate-limited downstream services
// by ordering items by importance and retrying failures with backoff.

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{QueueStats, QueueStatus, QueuedItemStatus, WorkQueue};
pub use domain::{EnqueueRequest, QueueConfig, WorkItem, WorkItemId, WorkItemType, WorkPayload};
pub use error::{QueueError, Result};
pub use port::{Processor, ProcessorError, ProcessorResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
