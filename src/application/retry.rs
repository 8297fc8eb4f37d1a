// Retry logic - exponential backoff with additive jitter

use crate::domain::{QueueConfig, WorkItem};
use crate::port::JitterSource;
use std::sync::Arc;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the item after the given backoff delay (ms)
    Retry { delay_ms: i64 },
    /// Retry budget exhausted; the item fails permanently
    Exhausted,
}

/// Retry policy
///
/// Invoked only when a dispatched item fails. Per failed attempt exactly one
/// of {reschedule, permanent failure} happens.
pub struct RetryPolicy {
    base_delay_ms: i64,
    max_delay_ms: i64,
    backoff_multiplier: f64,
    jitter: Arc<dyn JitterSource>,
}

impl RetryPolicy {
    pub fn new(config: &QueueConfig, jitter: Arc<dyn JitterSource>) -> Self {
        Self {
            base_delay_ms: config.retry_delay_ms,
            max_delay_ms: config.max_retry_delay_ms,
            backoff_multiplier: config.backoff_multiplier,
            jitter,
        }
    }

    /// Decide what to do with a just-failed item.
    ///
    /// For retry attempt `n` (the item's retry_count after incrementing):
    ///
    /// `delay = min(base × multiplier^(n-1) + jitter, max_delay)`
    ///
    /// with jitter drawn uniformly from `[0, 1000)` ms. The jitter is inside
    /// the cap, so the cap is a hard ceiling on the scheduled delay.
    pub fn decide(&self, item: &WorkItem) -> RetryDecision {
        if item.retries_exhausted() {
            warn!(
                item_id = %item.id,
                retry_count = %item.retry_count,
                max_retries = %item.max_retries,
                "Max retry attempts reached"
            );
            return RetryDecision::Exhausted;
        }

        // Exponent is the attempt number about to be recorded, minus one:
        // first retry waits the base delay.
        let exponent = item.retry_count as i32;
        let backoff = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let delay_ms = ((backoff as i64).saturating_add(self.jitter.jitter_ms()))
            .min(self.max_delay_ms);

        info!(
            item_id = %item.id,
            attempt = item.retry_count + 1,
            max_retries = %item.max_retries,
            delay_ms = %delay_ms,
            "Scheduling retry"
        );

        RetryDecision::Retry { delay_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{WorkItemType, WorkPayload};
    use crate::port::jitter::mocks::FixedJitter;

    fn config() -> QueueConfig {
        QueueConfig {
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            ..QueueConfig::default()
        }
    }

    fn item(retry_count: u32, max_retries: u32) -> WorkItem {
        WorkItem {
            id: "stream_start_1000_x".to_string(),
            item_type: WorkItemType::StreamStart,
            game_type: None,
            streaming_id: None,
            priority: 3,
            retry_count,
            max_retries,
            created_at: 1000,
            scheduled_for: 1000,
            data: WorkPayload::new(serde_json::json!({})),
        }
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(&config(), Arc::new(FixedJitter(0)));

        for (retry_count, expected) in [(0, 1000), (1, 2000), (2, 4000), (3, 8000)] {
            match policy.decide(&item(retry_count, 10)) {
                RetryDecision::Retry { delay_ms } => assert_eq!(delay_ms, expected),
                RetryDecision::Exhausted => panic!("budget not exhausted yet"),
            }
        }
    }

    #[test]
    fn test_jitter_is_additive() {
        let policy = RetryPolicy::new(&config(), Arc::new(FixedJitter(250)));

        match policy.decide(&item(1, 10)) {
            RetryDecision::Retry { delay_ms } => assert_eq!(delay_ms, 2250),
            RetryDecision::Exhausted => panic!("budget not exhausted yet"),
        }
    }

    #[test]
    fn test_delay_capped_at_max_including_jitter() {
        let policy = RetryPolicy::new(&config(), Arc::new(FixedJitter(999)));

        // 1000 * 2^6 = 64000 would exceed the 30s cap
        match policy.decide(&item(6, 10)) {
            RetryDecision::Retry { delay_ms } => assert_eq!(delay_ms, 30_000),
            RetryDecision::Exhausted => panic!("budget not exhausted yet"),
        }
    }

    #[test]
    fn test_exhausted_at_max_retries() {
        let policy = RetryPolicy::new(&config(), Arc::new(FixedJitter(0)));

        assert_eq!(policy.decide(&item(2, 2)), RetryDecision::Exhausted);
        assert_eq!(policy.decide(&item(3, 2)), RetryDecision::Exhausted);
    }

    #[test]
    fn test_zero_retry_budget_never_retries() {
        let policy = RetryPolicy::new(&config(), Arc::new(FixedJitter(0)));
        assert_eq!(policy.decide(&item(0, 0)), RetryDecision::Exhausted);
    }
}
