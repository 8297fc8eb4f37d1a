// Central Error Type for the Queue Engine

use crate::domain::WorkItemType;
use thiserror::Error;

/// Queue-level error type
///
/// `QueueFull` is the only routine variant that reaches external callers
/// (from `enqueue`). `UnregisteredProcessor` and `HandlerFailed` are produced
/// and consumed inside the dispatch loop, where they drive the retry policy;
/// the only external trace of them is the log stream and the failure
/// counters. `Internal` covers loop-internal faults unrelated to any item,
/// which the loop logs and survives.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("No processor registered for item type {0}")]
    UnregisteredProcessor(WorkItemType),

    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using QueueError
pub type Result<T> = std::result::Result<T, QueueError>;
