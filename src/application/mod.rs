// Application Layer - the queue engine

pub mod dispatcher;
pub mod registry;
pub mod retry;
pub mod stats;

// Re-exports
pub use dispatcher::WorkQueue;
pub use registry::ProcessorRegistry;
pub use retry::{RetryDecision, RetryPolicy};
pub use stats::{QueueStats, QueueStatus, QueuedItemStatus, StatsRecorder};
