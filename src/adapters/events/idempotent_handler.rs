//! IdempotentHandler - Skips deliveries a handler has already processed.
//!
//! Queues deliver at-least-once. Wrapping a consumer in this adapter turns
//! redeliveries of an already handled event into no-ops:
//!
//! ```ignore
//! let handler = IdempotentHandler::new(AuditConsumer::new(), processed_events.clone());
//! QueueWorker::new(broker, queues::MEDICATION_AUDIT, Arc::new(handler));
//! ```
//!
//! If the inner handler fails the event is NOT marked as processed, so the
//! requeued delivery is handled again. Store errors are propagated.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::routing::EventEnvelope;
use crate::ports::{ProcessedEventStore, QueueHandler};

/// Decorates any `QueueHandler` with idempotency tracking, keyed by the
/// handler's `name()`.
pub struct IdempotentHandler<H: QueueHandler> {
    inner: H,
    processed_events: Arc<dyn ProcessedEventStore>,
}

impl<H: QueueHandler> IdempotentHandler<H> {
    pub fn new(inner: H, processed_events: Arc<dyn ProcessedEventStore>) -> Self {
        Self {
            inner,
            processed_events,
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<H: QueueHandler + 'static> QueueHandler for IdempotentHandler<H> {
    async fn handle(&self, envelope: EventEnvelope) -> Result<(), DomainError> {
        let handler_name = self.inner.name();

        if self
            .processed_events
            .contains(&envelope.event_id, handler_name)
            .await?
        {
            tracing::debug!(
                event_id = %envelope.event_id,
                handler = handler_name,
                "Skipping duplicate event"
            );
            return Ok(());
        }

        let event_id = envelope.event_id.clone();
        self.inner.handle(envelope).await?;

        self.processed_events
            .mark_processed(&event_id, handler_name)
            .await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
