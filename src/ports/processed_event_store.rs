//! ProcessedEventStore port - Interface for tracking processed events.
//!
//! Queue delivery is at-least-once: a consumer that fails after handling
//! but before its ack sees the same event again. This store records which
//! events each handler has already processed.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId, Timestamp};

/// Port for tracking which events have been processed by which handlers.
///
/// Records are per handler, so two handlers may each process the same
/// event once.
#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    /// Returns `true` if the event has already been processed by this handler.
    async fn contains(&self, event_id: &EventId, handler_name: &str) -> Result<bool, DomainError>;

    /// Mark an event as processed by a specific handler.
    ///
    /// Call AFTER successful handling so failures are retried.
    async fn mark_processed(&self, event_id: &EventId, handler_name: &str)
        -> Result<(), DomainError>;

    /// Removes entries recorded before `timestamp`. Returns how many were removed.
    async fn delete_before(&self, timestamp: Timestamp) -> Result<u64, DomainError>;
}
