//! QueueHandler port - Consumer logic for one queue.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::routing::EventEnvelope;

/// Handler invoked by a queue worker for each delivery.
///
/// Delivery is at-least-once, so implementations must tolerate seeing the
/// same event twice. Wrap a handler in `IdempotentHandler` to skip
/// duplicates automatically.
///
/// # Example
///
/// ```ignore
/// struct AuditLog;
///
/// #[async_trait]
/// impl QueueHandler for AuditLog {
///     async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
///         let payload: MedicationCreated = event
///             .payload_as()
///             .map_err(|e| DomainError::invalid_payload(&event.routing_key, e))?;
///         tracing::info!(medication_id = payload.medication_id, "audit");
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "AuditLog"
///     }
/// }
/// ```
#[async_trait]
pub trait QueueHandler: Send + Sync {
    /// Process an event. A retryable `Err` requeues the delivery; any other
    /// `Err` drops it.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging and idempotency records.
    fn name(&self) -> &'static str;
}

/// Lets one handler instance (and its state) serve several queues.
#[async_trait]
impl<H: QueueHandler + ?Sized> QueueHandler for std::sync::Arc<H> {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        (**self).handle(event).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
