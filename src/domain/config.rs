// Queue Configuration

use serde::{Deserialize, Serialize};

/// Queue configuration, constructed once and immutable thereafter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Ceiling on simultaneously in-flight handlers
    pub max_concurrent: usize,
    /// Ceiling on pending items; `enqueue` fails with `QueueFull` beyond it
    pub max_queue_size: usize,
    /// Priority assigned when the producer does not supply one
    pub default_priority: i32,
    /// Base retry delay in milliseconds
    pub retry_delay_ms: i64,
    /// Cap applied to the computed retry delay
    pub max_retry_delay_ms: i64,
    /// Geometric growth factor for successive retry delays
    pub backoff_multiplier: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_queue_size: 1000,
            default_priority: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}
