//! Analytics consumer - running counters over routed events.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::medication::CatalogEvent;
use crate::domain::routing::EventEnvelope;
use crate::ports::QueueHandler;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub events_by_key: BTreeMap<String, u64>,
    pub critical_interactions: u64,
    pub ratings: u64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Default)]
struct Counters {
    events_by_key: BTreeMap<String, u64>,
    critical_interactions: u64,
    ratings: u64,
    rating_sum: u64,
}

/// Counts events per routing key and tracks the average user rating.
/// Keys the catalog does not know are counted but not interpreted.
#[derive(Debug, Default)]
pub struct AnalyticsConsumer {
    counters: RwLock<Counters>,
}

impl AnalyticsConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> AnalyticsSnapshot {
        let counters = self.counters.read().await;
        AnalyticsSnapshot {
            events_by_key: counters.events_by_key.clone(),
            critical_interactions: counters.critical_interactions,
            ratings: counters.ratings,
            average_rating: (counters.ratings > 0)
                .then(|| counters.rating_sum as f64 / counters.ratings as f64),
        }
    }
}

#[async_trait]
impl QueueHandler for AnalyticsConsumer {
    async fn handle(&self, envelope: EventEnvelope) -> Result<(), DomainError> {
        let event = match CatalogEvent::from_envelope(&envelope) {
            Ok(event) => Some(event),
            Err(e) if e.code == ErrorCode::UnknownEventType => None,
            Err(e) => return Err(e),
        };

        let mut counters = self.counters.write().await;
        *counters
            .events_by_key
            .entry(envelope.routing_key.clone())
            .or_insert(0) += 1;

        match &event {
            Some(CatalogEvent::InteractionChecked(e)) if e.is_critical() => {
                counters.critical_interactions += 1;
            }
            Some(CatalogEvent::Rated(e)) => {
                counters.ratings += 1;
                counters.rating_sum += u64::from(e.rating);
                tracing::debug!(
                    user_id = %e.user_id,
                    rating = e.rating,
                    average = counters.rating_sum as f64 / counters.ratings as f64,
                    "Rating recorded"
                );
            }
            _ => {}
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "AnalyticsConsumer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::medication::{MedicationCreated, RoutedEvent, UserRated};

    fn rating(value: u8) -> EventEnvelope {
        UserRated {
            user_id: "u1".to_string(),
            rating: value,
            verdict: "ok".to_string(),
        }
        .to_envelope()
        .unwrap()
    }

    #[tokio::test]
    async fn counts_events_per_routing_key() {
        let consumer = AnalyticsConsumer::new();
        let created = MedicationCreated {
            medication_id: 1,
            medication_name: "Aspirin".to_string(),
            inn: "acetylsalicylic acid".to_string(),
            manufacturer_name: None,
            prescription_required: false,
        };

        consumer.handle(created.to_envelope().unwrap()).await.unwrap();
        consumer.handle(created.to_envelope().unwrap()).await.unwrap();
        consumer.handle(rating(4)).await.unwrap();

        let snapshot = consumer.snapshot().await;
        assert_eq!(snapshot.events_by_key.get("medication.created"), Some(&2));
        assert_eq!(snapshot.events_by_key.get("rating.submitted"), Some(&1));
    }

    #[tokio::test]
    async fn counts_unknown_keys_and_rejects_bad_payloads() {
        let consumer = AnalyticsConsumer::new();

        consumer
            .handle(EventEnvelope::new("medication.archived", serde_json::json!({})))
            .await
            .unwrap();
        let err = consumer
            .handle(EventEnvelope::new("rating.submitted", serde_json::json!({"rating": "x"})))
            .await
            .unwrap_err();

        assert!(!err.is_retryable());
        let snapshot = consumer.snapshot().await;
        assert_eq!(snapshot.events_by_key.get("medication.archived"), Some(&1));
        assert_eq!(snapshot.events_by_key.get("rating.submitted"), None);
    }

    #[tokio::test]
    async fn averages_ratings() {
        let consumer = AnalyticsConsumer::new();
        assert_eq!(consumer.snapshot().await.average_rating, None);

        consumer.handle(rating(4)).await.unwrap();
        consumer.handle(rating(5)).await.unwrap();

        let snapshot = consumer.snapshot().await;
        assert_eq!(snapshot.ratings, 2);
        assert_eq!(snapshot.average_rating, Some(4.5));
    }
}
