// Processor Registry - type -> handler mapping, resolved at dispatch time

use crate::domain::WorkItemType;
use crate::port::Processor;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// One processor per work item type, overwriting on re-register.
///
/// Resolution is deliberately lazy: items may be enqueued before their
/// processor is registered (producers and registrations can race at
/// startup), and a missing processor only surfaces at dispatch time as
/// `UnregisteredProcessor`. Misconfiguration therefore shows up late, in
/// logs and failure counters rather than at enqueue.
pub struct ProcessorRegistry {
    processors: RwLock<HashMap<WorkItemType, Arc<dyn Processor>>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the processor for a type
    pub fn register(&self, item_type: WorkItemType, processor: Arc<dyn Processor>) {
        let replaced = self
            .processors
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(item_type, processor)
            .is_some();
        info!(item_type = %item_type, replaced = replaced, "Processor registered");
    }

    /// Resolve the processor for a type, if any
    pub fn resolve(&self, item_type: WorkItemType) -> Option<Arc<dyn Processor>> {
        self.processors
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&item_type)
            .cloned()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::processor::mocks::MockProcessor;

    #[test]
    fn test_resolve_unregistered_is_none() {
        let registry = ProcessorRegistry::new();
        assert!(registry.resolve(WorkItemType::StreamStart).is_none());
    }

    #[test]
    fn test_register_overwrites_prior_registration() {
        let registry = ProcessorRegistry::new();
        let first = Arc::new(MockProcessor::new_success());
        let second = Arc::new(MockProcessor::new_fail("replaced"));

        registry.register(WorkItemType::Notification, first);
        registry.register(WorkItemType::Notification, second.clone());

        let resolved = registry.resolve(WorkItemType::Notification).unwrap();
        // The replacement, not the original, must be resolved
        let second: Arc<dyn crate::port::Processor> = second;
        assert!(Arc::ptr_eq(&resolved, &second));
        assert!(registry.resolve(WorkItemType::StreamStop).is_none());
    }
}
