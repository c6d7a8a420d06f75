//! Typed payloads published by the medication catalog.
//!
//! Each event knows the exchange and routing key it is published under, so
//! producers never spell routing keys by hand:
//!
//! ```ignore
//! let envelope = event.to_envelope()?;
//! publisher.publish(MedicationCreated::EXCHANGE, envelope).await;
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Severity;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::routing::{exchanges, routing_keys, EventEnvelope};

/// An event with a fixed place in the canonical topology.
pub trait RoutedEvent: Serialize + Sized {
    const EXCHANGE: &'static str;
    const ROUTING_KEY: &'static str;

    /// Wraps the event in a fresh envelope carrying its routing key.
    fn to_envelope(&self) -> Result<EventEnvelope, serde_json::Error> {
        EventEnvelope::from_event(Self::ROUTING_KEY, self)
    }
}

macro_rules! routed_event {
    ($event:ident, exchange = $exchange:expr, routing_key = $key:expr) => {
        impl RoutedEvent for $event {
            const EXCHANGE: &'static str = $exchange;
            const ROUTING_KEY: &'static str = $key;
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationCreated {
    pub medication_id: i64,
    pub medication_name: String,
    pub inn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_name: Option<String>,
    #[serde(default)]
    pub prescription_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationUpdated {
    pub medication_id: i64,
    pub medication_name: String,
    pub inn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_inn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationDeleted {
    pub medication_id: i64,
    pub medication_name: String,
    pub inn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationExpiring {
    pub medication_id: i64,
    pub medication_name: String,
    pub expiration_date: NaiveDate,
    pub days_left: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevelLow {
    pub medication_id: i64,
    pub medication_name: String,
    pub current_stock: u32,
    pub min_stock: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInteractionChecked {
    pub medication_id: i64,
    pub medication_name: String,
    pub risk_level: u8,
    pub severity: Severity,
    #[serde(default)]
    pub contraindications: Vec<String>,
    pub recommendation: String,
}

impl DrugInteractionChecked {
    /// High severity or a risk level above 7.
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::High || self.risk_level > 7
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRated {
    pub user_id: String,
    pub rating: u8,
    pub verdict: String,
}

routed_event!(
    MedicationCreated,
    exchange = exchanges::MEDICATIONS,
    routing_key = routing_keys::MEDICATION_CREATED
);
routed_event!(
    MedicationUpdated,
    exchange = exchanges::MEDICATIONS,
    routing_key = routing_keys::MEDICATION_UPDATED
);
routed_event!(
    MedicationDeleted,
    exchange = exchanges::MEDICATIONS,
    routing_key = routing_keys::MEDICATION_DELETED
);
routed_event!(
    MedicationExpiring,
    exchange = exchanges::MEDICATIONS,
    routing_key = routing_keys::MEDICATION_EXPIRING
);
routed_event!(
    StockLevelLow,
    exchange = exchanges::MEDICATIONS,
    routing_key = routing_keys::MEDICATION_LOW_STOCK
);
routed_event!(
    DrugInteractionChecked,
    exchange = exchanges::INTERACTIONS,
    routing_key = routing_keys::INTERACTION_CHECKED
);
routed_event!(
    UserRated,
    exchange = exchanges::ANALYTICS_FANOUT,
    routing_key = routing_keys::RATING_SUBMITTED
);

/// Any catalog event, decoded by routing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    Created(MedicationCreated),
    Updated(MedicationUpdated),
    Deleted(MedicationDeleted),
    Expiring(MedicationExpiring),
    LowStock(StockLevelLow),
    InteractionChecked(DrugInteractionChecked),
    Rated(UserRated),
}

impl CatalogEvent {
    /// Decodes the payload according to the envelope's routing key.
    ///
    /// Unknown keys fail with `UnknownEventType`; payloads that do not fit
    /// their key fail with `InvalidPayload`.
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Self, DomainError> {
        fn decode<T: for<'de> Deserialize<'de>>(envelope: &EventEnvelope) -> Result<T, DomainError> {
            envelope
                .payload_as()
                .map_err(|e| DomainError::invalid_payload(&envelope.routing_key, e))
        }

        let event = match envelope.routing_key.as_str() {
            routing_keys::MEDICATION_CREATED => CatalogEvent::Created(decode(envelope)?),
            routing_keys::MEDICATION_UPDATED => CatalogEvent::Updated(decode(envelope)?),
            routing_keys::MEDICATION_DELETED => CatalogEvent::Deleted(decode(envelope)?),
            routing_keys::MEDICATION_EXPIRING => CatalogEvent::Expiring(decode(envelope)?),
            routing_keys::MEDICATION_LOW_STOCK => CatalogEvent::LowStock(decode(envelope)?),
            routing_keys::INTERACTION_CHECKED => {
                CatalogEvent::InteractionChecked(decode(envelope)?)
            }
            routing_keys::RATING_SUBMITTED => CatalogEvent::Rated(decode(envelope)?),
            other => {
                return Err(DomainError::new(
                    ErrorCode::UnknownEventType,
                    format!("No event type for routing key '{}'", other),
                )
                .with_detail("routing_key", other))
            }
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> MedicationCreated {
        MedicationCreated {
            medication_id: 42,
            medication_name: "Warfarin".to_string(),
            inn: "warfarin".to_string(),
            manufacturer_name: None,
            prescription_required: true,
        }
    }

    #[test]
    fn envelope_carries_routing_key_and_camel_case_payload() {
        let envelope = created().to_envelope().unwrap();

        assert_eq!(envelope.routing_key, "medication.created");
        assert_eq!(envelope.payload["medicationId"], 42);
        assert_eq!(envelope.payload["prescriptionRequired"], true);
        assert!(envelope.payload.get("manufacturerName").is_none());
    }

    #[test]
    fn payload_decodes_back_into_event() {
        let envelope = created().to_envelope().unwrap();
        assert_eq!(envelope.payload_as::<MedicationCreated>().unwrap(), created());
    }

    #[test]
    fn interaction_is_critical_on_high_severity_or_level_above_seven() {
        let mut event = DrugInteractionChecked {
            medication_id: 1,
            medication_name: "Digoxin".to_string(),
            risk_level: 3,
            severity: Severity::Low,
            contraindications: vec![],
            recommendation: String::new(),
        };
        assert!(!event.is_critical());

        event.severity = Severity::High;
        assert!(event.is_critical());

        event.severity = Severity::Medium;
        event.risk_level = 8;
        assert!(event.is_critical());
    }

    #[test]
    fn expiring_date_serializes_as_iso_date() {
        let event = MedicationExpiring {
            medication_id: 5,
            medication_name: "Omeprazole".to_string(),
            expiration_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            days_left: 30,
        };
        let envelope = event.to_envelope().unwrap();
        assert_eq!(envelope.payload["expirationDate"], "2026-12-31");
        assert_eq!(envelope.payload["daysLeft"], 30);
    }

    #[test]
    fn catalog_event_decodes_by_routing_key() {
        let envelope = created().to_envelope().unwrap();
        assert_eq!(
            CatalogEvent::from_envelope(&envelope).unwrap(),
            CatalogEvent::Created(created())
        );
    }

    #[test]
    fn catalog_event_rejects_unknown_key() {
        let envelope = EventEnvelope::new("medication.archived", serde_json::json!({}));
        let err = CatalogEvent::from_envelope(&envelope).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownEventType);
    }

    #[test]
    fn catalog_event_rejects_mismatched_payload() {
        let envelope = EventEnvelope::new("interaction.checked", serde_json::json!({"x": 1}));
        let err = CatalogEvent::from_envelope(&envelope).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPayload);
    }

    #[test]
    fn events_declare_canonical_exchanges() {
        assert_eq!(DrugInteractionChecked::EXCHANGE, "interactions-exchange");
        assert_eq!(UserRated::EXCHANGE, "analytics-fanout");
        assert_eq!(StockLevelLow::ROUTING_KEY, "medication.low-stock");
    }
}
