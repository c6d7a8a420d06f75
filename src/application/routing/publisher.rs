//! EventPublisher - producer entry point onto the broker.

use std::sync::Arc;

use crate::domain::medication::RoutedEvent;
use crate::domain::routing::{DeliveryOutcome, EventEnvelope};
use crate::ports::MessageBroker;

/// Publishes envelopes to named exchanges and reports the outcome.
///
/// When a mirror exchange is configured, every confirmed publish is also
/// copied there. The mirror outcome is logged and never changes the
/// primary outcome.
pub struct EventPublisher {
    broker: Arc<dyn MessageBroker>,
    mirror: Option<String>,
}

impl EventPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self {
            broker,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, exchange: impl Into<String>) -> Self {
        self.mirror = Some(exchange.into());
        self
    }

    /// Publishes and waits until every selected queue holds its copy.
    pub async fn publish(&self, exchange: &str, envelope: EventEnvelope) -> DeliveryOutcome {
        let event_id = envelope.event_id.clone();
        let routing_key = envelope.routing_key.clone();
        let mirror_copy = self
            .mirror
            .as_deref()
            .filter(|mirror| *mirror != exchange)
            .map(|mirror| (mirror, envelope.clone()));

        let outcome = self.broker.publish(exchange, envelope).await;

        match &outcome {
            DeliveryOutcome::Confirmed { routed: 0 } => tracing::debug!(
                exchange, routing_key = %routing_key, event_id = %event_id,
                "Published event matched no queue"
            ),
            DeliveryOutcome::Confirmed { routed } => tracing::info!(
                exchange, routing_key = %routing_key, event_id = %event_id, routed,
                "Published event"
            ),
            DeliveryOutcome::Rejected(reason) => tracing::warn!(
                exchange, routing_key = %routing_key, event_id = %event_id, reason = %reason,
                "Publish rejected"
            ),
        }

        if let (true, Some((mirror, copy))) = (outcome.is_confirmed(), mirror_copy) {
            let mirrored = self.broker.publish(mirror, copy).await;
            if !mirrored.is_confirmed() {
                tracing::warn!(exchange = mirror, event_id = %event_id, outcome = ?mirrored, "Mirror publish failed");
            }
        }

        outcome
    }

    /// Publishes and invokes `on_confirm` exactly once with the final outcome.
    pub async fn publish_confirmed<F>(
        &self,
        exchange: &str,
        envelope: EventEnvelope,
        on_confirm: F,
    ) -> DeliveryOutcome
    where
        F: FnOnce(&DeliveryOutcome) + Send,
    {
        let outcome = self.publish(exchange, envelope).await;
        on_confirm(&outcome);
        outcome
    }

    /// Publishes a typed event under its canonical exchange and routing key.
    pub async fn publish_event<E: RoutedEvent + Sync>(
        &self,
        event: &E,
    ) -> Result<DeliveryOutcome, serde_json::Error> {
        let envelope = event.to_envelope()?;
        Ok(self.publish(E::EXCHANGE, envelope).await)
    }
}
