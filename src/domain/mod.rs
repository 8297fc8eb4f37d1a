// Domain Layer - Pure data model and the priority store

pub mod config;
pub mod item;
pub mod store;

// Re-exports
pub use config::QueueConfig;
pub use item::{
    EnqueueRequest, WorkItem, WorkItemId, WorkItemType, WorkPayload, DEFAULT_MAX_RETRIES,
};
pub use store::PriorityStore;
