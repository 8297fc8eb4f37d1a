// Processor Port
// Abstraction for the pluggable per-type work handlers

use crate::domain::WorkItem;
use async_trait::async_trait;

/// Outcome reported by a processor for one dispatch attempt
pub type ProcessorResult = std::result::Result<(), ProcessorError>;

/// Failure raised by a processor
///
/// Opaque to the engine: any failure feeds the retry policy the same way.
#[derive(Debug, Clone)]
pub struct ProcessorError(pub String);

impl std::fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ProcessorError {}

impl ProcessorError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Work handler trait
///
/// One processor is registered per `WorkItemType`; the engine resolves it
/// lazily at dispatch time. Processors run on their own spawned task, so a
/// slow processor delays only its own in-flight slot, never the dispatch
/// loop.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Process one work item
    ///
    /// # Errors
    /// Any `ProcessorError` marks the attempt failed and hands the item to
    /// the retry policy.
    async fn process(&self, item: &WorkItem) -> ProcessorResult;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock processor behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Fail the first N attempts, then succeed
        FailFirst(usize),
        /// Sleep for the given duration, then succeed (slot-occupancy tests)
        Delay(Duration),
    }

    /// Mock Processor for testing
    pub struct MockProcessor {
        behavior: MockBehavior,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockProcessor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Item ids in the order attempts were made
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Processor for MockProcessor {
        async fn process(&self, item: &WorkItem) -> ProcessorResult {
            let attempt = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(item.id.clone());
                calls.len()
            };

            match &self.behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(ProcessorError::new(msg.clone())),
                MockBehavior::FailFirst(n) => {
                    if attempt <= *n {
                        Err(ProcessorError::new(format!("induced failure {attempt}")))
                    } else {
                        Ok(())
                    }
                }
                MockBehavior::Delay(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(())
                }
            }
        }
    }
}
