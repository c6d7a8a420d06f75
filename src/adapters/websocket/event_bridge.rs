//! Event bridge from the notification queue to connected clients.
//!
//! ```text
//! q.notification.medications
//!          │  QueueWorker
//!          ▼
//! ┌────────────────────┐
//! │ NotificationBridge │  decode CatalogEvent
//! └────────────────────┘  → Notification
//!          │
//!          ▼
//! ┌────────────────────┐
//! │ NotificationBroad- │  broadcast + escalation
//! │ caster::notify     │
//! └────────────────────┘
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::NotificationBroadcaster;
use crate::domain::foundation::DomainError;
use crate::domain::medication::CatalogEvent;
use crate::domain::notification::Notification;
use crate::domain::routing::EventEnvelope;
use crate::ports::QueueHandler;

/// Turns routed catalog events into client notifications.
///
/// Delivery to clients is best-effort: the delivery is acked once the
/// broadcast ran, whatever it reached.
pub struct NotificationBridge {
    broadcaster: Arc<NotificationBroadcaster>,
}

impl NotificationBridge {
    pub fn new(broadcaster: Arc<NotificationBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

#[async_trait]
impl QueueHandler for NotificationBridge {
    async fn handle(&self, envelope: EventEnvelope) -> Result<(), DomainError> {
        let event = CatalogEvent::from_envelope(&envelope)?;

        let Some(notification) = Notification::from_catalog_event(&event) else {
            return Ok(());
        };

        let report = self.broadcaster.notify(notification).await;
        tracing::debug!(
            event_id = %envelope.event_id,
            routing_key = %envelope.routing_key,
            tag = report.tag,
            delivered = report.delivered,
            "Bridged event to clients"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NotificationBridge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::notifications::registry::testing::RecordingTransport;
    use crate::application::ConnectionRegistry;
    use crate::domain::medication::{DrugInteractionChecked, RoutedEvent, Severity, UserRated};

    async fn bridge_with_client() -> (NotificationBridge, RecordingTransport) {
        let registry = Arc::new(ConnectionRegistry::new());
        let transport = RecordingTransport::new();
        registry.register(transport.clone()).await;
        let broadcaster = Arc::new(NotificationBroadcaster::new(registry));
        (NotificationBridge::new(broadcaster), transport)
    }

    #[tokio::test]
    async fn critical_interaction_reaches_client_with_alert() {
        let (bridge, transport) = bridge_with_client().await;
        let envelope = DrugInteractionChecked {
            medication_id: 1,
            medication_name: "Warfarin".to_string(),
            risk_level: 9,
            severity: Severity::High,
            contraindications: vec![],
            recommendation: "consult".to_string(),
        }
        .to_envelope()
        .unwrap();

        bridge.handle(envelope).await.unwrap();

        let frames = transport.frames();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].contains("\"type\":\"drug-interaction\""));
        assert!(frames[1].contains("\"type\":\"critical-alert\""));
    }

    #[tokio::test]
    async fn ratings_are_not_pushed() {
        let (bridge, transport) = bridge_with_client().await;
        let envelope = UserRated {
            user_id: "u1".to_string(),
            rating: 5,
            verdict: "great".to_string(),
        }
        .to_envelope()
        .unwrap();

        bridge.handle(envelope).await.unwrap();

        assert!(transport.frames().is_empty());
    }

    #[tokio::test]
    async fn unknown_event_is_a_permanent_error() {
        let (bridge, transport) = bridge_with_client().await;
        let envelope = EventEnvelope::new("medication.archived", serde_json::json!({}));

        let err = bridge.handle(envelope).await.unwrap_err();

        assert!(!err.is_retryable());
        assert!(transport.frames().is_empty());
    }
}
