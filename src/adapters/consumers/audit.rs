//! Audit consumer - structured log line per lifecycle event.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::medication::CatalogEvent;
use crate::domain::routing::EventEnvelope;
use crate::ports::QueueHandler;

/// Writes every consumed event to the audit log target.
///
/// Prescription-only creations are logged at warn, critical interaction
/// checks at error, everything else at info. Routing keys the catalog does
/// not know yet are still recorded, at warn.
#[derive(Debug, Default)]
pub struct AuditConsumer {
    recorded: AtomicU64,
}

impl AuditConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QueueHandler for AuditConsumer {
    async fn handle(&self, envelope: EventEnvelope) -> Result<(), DomainError> {
        let event_id = envelope.event_id.as_str();
        let event = match CatalogEvent::from_envelope(&envelope) {
            Ok(event) => event,
            Err(e) if e.code == ErrorCode::UnknownEventType => {
                tracing::warn!(
                    target: "audit",
                    event_id,
                    routing_key = %envelope.routing_key,
                    payload = %envelope.payload,
                    "Unrecognized catalog event"
                );
                self.recorded.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match &event {
            CatalogEvent::Created(e) if e.prescription_required => tracing::warn!(
                target: "audit",
                event_id,
                medication_id = e.medication_id,
                medication = %e.medication_name,
                "Prescription-only medication created"
            ),
            CatalogEvent::Created(e) => tracing::info!(
                target: "audit",
                event_id,
                medication_id = e.medication_id,
                medication = %e.medication_name,
                "Medication created"
            ),
            CatalogEvent::Updated(e) => tracing::info!(
                target: "audit",
                event_id,
                medication_id = e.medication_id,
                medication = %e.medication_name,
                "Medication updated"
            ),
            CatalogEvent::Deleted(e) => tracing::info!(
                target: "audit",
                event_id,
                medication_id = e.medication_id,
                medication = %e.medication_name,
                "Medication deleted"
            ),
            CatalogEvent::Expiring(e) => tracing::info!(
                target: "audit",
                event_id,
                medication_id = e.medication_id,
                days_left = e.days_left,
                "Medication expiring"
            ),
            CatalogEvent::LowStock(e) => tracing::info!(
                target: "audit",
                event_id,
                medication_id = e.medication_id,
                current_stock = e.current_stock,
                min_stock = e.min_stock,
                "Stock below minimum"
            ),
            CatalogEvent::InteractionChecked(e) if e.is_critical() => tracing::error!(
                target: "audit",
                event_id,
                medication_id = e.medication_id,
                risk_level = e.risk_level,
                severity = %e.severity,
                recommendation = %e.recommendation,
                "Critical drug interaction"
            ),
            CatalogEvent::InteractionChecked(e) => tracing::info!(
                target: "audit",
                event_id,
                medication_id = e.medication_id,
                risk_level = e.risk_level,
                severity = %e.severity,
                "Interaction checked"
            ),
            CatalogEvent::Rated(e) => tracing::info!(
                target: "audit",
                event_id,
                user_id = %e.user_id,
                rating = e.rating,
                "Rating submitted"
            ),
        }

        self.recorded.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AuditConsumer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::medication::{DrugInteractionChecked, RoutedEvent, Severity};
    use serde_json::json;

    #[tokio::test]
    async fn records_known_events() {
        let consumer = AuditConsumer::new();
        let envelope = DrugInteractionChecked {
            medication_id: 2,
            medication_name: "Digoxin".to_string(),
            risk_level: 9,
            severity: Severity::High,
            contraindications: vec!["quinidine".to_string()],
            recommendation: "consult".to_string(),
        }
        .to_envelope()
        .unwrap();

        consumer.handle(envelope).await.unwrap();

        assert_eq!(consumer.recorded(), 1);
    }

    #[tokio::test]
    async fn records_unknown_routing_keys() {
        let consumer = AuditConsumer::new();
        let envelope = EventEnvelope::new("medication.archived", json!({}));

        consumer.handle(envelope).await.unwrap();

        assert_eq!(consumer.recorded(), 1);
    }

    #[tokio::test]
    async fn rejects_undecodable_payloads() {
        let consumer = AuditConsumer::new();
        let envelope = EventEnvelope::new("medication.created", json!({"oops": true}));

        let err = consumer.handle(envelope).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidPayload);
        assert_eq!(consumer.recorded(), 0);
    }
}
