// Port Layer - Interfaces for external collaborators

pub mod id_provider; // For deterministic testing
pub mod jitter;
pub mod processor;
pub mod time_provider;

// Re-exports
pub use id_provider::{IdProvider, RandomIdProvider};
pub use jitter::{JitterSource, ThreadRngJitter, JITTER_RANGE_MS};
pub use processor::{Processor, ProcessorError, ProcessorResult};
pub use time_provider::{SystemTimeProvider, TimeProvider};
