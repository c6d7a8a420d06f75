//! Queue consumption adapters.
//!
//! - `QueueWorker` - Background loop that drains one queue into a handler
//! - `IdempotentHandler` - Wrapper for at-most-once event processing
//! - `InMemoryProcessedEventStore` - Process-local record of handled events

mod idempotent_handler;
mod processed_store;
mod queue_worker;

pub use idempotent_handler::IdempotentHandler;
pub use processed_store::InMemoryProcessedEventStore;
pub use queue_worker::{BatchReport, QueueWorker, QueueWorkerConfig};
