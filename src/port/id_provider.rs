// ID Provider Port (for deterministic testing)

use crate::domain::WorkItemType;

/// Length of the random alphanumeric id suffix
const SUFFIX_LEN: usize = 6;

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a work item id of the form `<type>_<epoch-ms>_<suffix>`
    fn generate(&self, item_type: WorkItemType, now_millis: i64) -> String;
}

/// Random-suffix provider (production)
pub struct RandomIdProvider;

impl IdProvider for RandomIdProvider {
    fn generate(&self, item_type: WorkItemType, now_millis: i64) -> String {
        use rand::distributions::Alphanumeric;
        use rand::Rng;

        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        format!("{}_{}_{}", item_type.as_str(), now_millis, suffix)
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Counter-based provider for deterministic test ids
    pub struct SequentialIdProvider {
        counter: AtomicU64,
    }

    impl SequentialIdProvider {
        pub fn new() -> Self {
            Self {
                counter: AtomicU64::new(1),
            }
        }
    }

    impl Default for SequentialIdProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdProvider for SequentialIdProvider {
        fn generate(&self, item_type: WorkItemType, now_millis: i64) -> String {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            format!("{}_{}_{:06}", item_type.as_str(), now_millis, n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format() {
        let id = RandomIdProvider.generate(WorkItemType::ScoreUpdate, 1_700_000_000_000);
        let parts: Vec<&str> = id.rsplitn(2, '_').collect();
        assert_eq!(parts[0].len(), SUFFIX_LEN);
        assert!(parts[1].starts_with("score_update_1700000000000"));
    }
}
