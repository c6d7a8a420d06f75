//! Transport envelope for routed events and the broker-side delivery types.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::domain::foundation::{EventId, Timestamp};

/// Correlation context that travels with an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// ID linking related events across a single request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// User who initiated the action that led to this event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Transport envelope for a published event.
///
/// The router only inspects `routing_key`; the payload is opaque JSON. Every
/// queue selected by a publish receives its own copy of the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique ID for this event instance (consumer deduplication).
    pub event_id: EventId,

    /// Dot-separated key matched against binding patterns.
    pub routing_key: String,

    /// When the producer handed the event to the publisher.
    pub published_at: Timestamp,

    /// Event-specific payload as JSON.
    pub payload: JsonValue,

    #[serde(default)]
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    pub fn new(routing_key: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            event_id: EventId::new(),
            routing_key: routing_key.into(),
            published_at: Timestamp::now(),
            payload,
            metadata: EventMetadata::default(),
        }
    }

    /// Builds an envelope by serializing a typed event.
    pub fn from_event<T: Serialize>(
        routing_key: impl Into<String>,
        event: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(routing_key, serde_json::to_value(event)?))
    }

    pub fn with_event_id(mut self, event_id: EventId) -> Self {
        self.event_id = event_id;
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.user_id = Some(id.into());
        self
    }

    /// Deserialize payload to a specific event type.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// One copy of an envelope handed to a consumer.
///
/// Must be acked or requeued. A requeued delivery comes back with
/// `redelivered` set.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub queue: String,
    pub delivery_tag: u64,
    pub envelope: EventEnvelope,
    pub redelivered: bool,
}

/// Why a publish was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("unknown exchange: {0}")]
    UnknownExchange(String),
}

/// Final result of a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every selected queue holds its copy. `routed` may be zero.
    Confirmed { routed: usize },
    Rejected(RejectReason),
}

impl DeliveryOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, DeliveryOutcome::Confirmed { .. })
    }

    pub fn routed(&self) -> usize {
        match self {
            DeliveryOutcome::Confirmed { routed } => *routed,
            DeliveryOutcome::Rejected(_) => 0,
        }
    }
}

#[cfg(test)]
impl EventEnvelope {
    pub fn test_fixture() -> Self {
        Self::new("medication.created", serde_json::json!({"medicationId": 1}))
    }
}
