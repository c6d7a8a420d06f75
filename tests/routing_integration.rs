//! Integration tests for event routing over the in-memory broker.
//!
//! Exercises the full producer path: topology bootstrap, publisher with
//! audit mirror, queue workers, and the audit/analytics consumers.

use std::sync::Arc;

use pharma_relay::adapters::consumers::{AnalyticsConsumer, AuditConsumer};
use pharma_relay::adapters::events::{BatchReport, InMemoryProcessedEventStore};
use pharma_relay::adapters::{IdempotentHandler, InMemoryBroker, QueueWorker};
use pharma_relay::adapters::websocket::NotificationBridge;
use pharma_relay::application::{
    declare_topology, ConnectionRegistry, EventPublisher, NotificationBroadcaster,
};
use pharma_relay::domain::medication::{
    DrugInteractionChecked, MedicationCreated, RoutedEvent, Severity, UserRated,
};
use pharma_relay::domain::routing::{
    exchanges, queues, Binding, CanonicalTopology, DeliveryOutcome, EventEnvelope, ExchangeSpec,
    QueueSpec, RejectReason,
};
use pharma_relay::ports::MessageBroker;

// =============================================================================
// Test Infrastructure
// =============================================================================

async fn canonical_broker() -> Arc<InMemoryBroker> {
    let broker = Arc::new(InMemoryBroker::new());
    declare_topology(broker.as_ref(), &CanonicalTopology::standard())
        .await
        .unwrap();
    broker
}

fn created(id: i64, prescription_required: bool) -> MedicationCreated {
    MedicationCreated {
        medication_id: id,
        medication_name: "Amoxicillin".to_string(),
        inn: "amoxicillin".to_string(),
        manufacturer_name: None,
        prescription_required,
    }
}

async fn depth(broker: &InMemoryBroker, queue: &str) -> usize {
    broker.queue_depth(queue).await.unwrap()
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn topic_exchange_routes_only_to_matching_bindings() {
    let broker = InMemoryBroker::new();
    broker
        .declare_exchange(ExchangeSpec::topic("catalog"))
        .await
        .unwrap();
    for queue in ["A", "B", "C"] {
        broker.declare_queue(QueueSpec::durable(queue)).await.unwrap();
    }
    broker.bind(Binding::new("catalog", "A", "medication.created")).await.unwrap();
    broker.bind(Binding::new("catalog", "B", "medication.*")).await.unwrap();
    broker.bind(Binding::new("catalog", "C", "interaction.*")).await.unwrap();

    let outcome = broker
        .publish("catalog", EventEnvelope::new("medication.created", serde_json::json!({})))
        .await;

    assert_eq!(outcome, DeliveryOutcome::Confirmed { routed: 2 });
    assert_eq!(depth(&broker, "A").await, 1);
    assert_eq!(depth(&broker, "B").await, 1);
    assert_eq!(depth(&broker, "C").await, 0);
}

#[tokio::test]
async fn fanout_without_queues_confirms_zero() {
    let broker = InMemoryBroker::new();
    broker
        .declare_exchange(ExchangeSpec::fanout("lonely"))
        .await
        .unwrap();

    let outcome = broker
        .publish("lonely", EventEnvelope::new("anything", serde_json::json!({})))
        .await;

    assert_eq!(outcome, DeliveryOutcome::Confirmed { routed: 0 });
}

#[tokio::test]
async fn canonical_medication_created_reaches_three_queues_plus_mirror() {
    let broker = canonical_broker().await;
    let publisher =
        EventPublisher::new(broker.clone()).with_mirror(exchanges::MEDICATIONS_FANOUT);

    let outcome = publisher.publish_event(&created(1, false)).await.unwrap();

    assert_eq!(outcome.routed(), 3);
    assert_eq!(depth(&broker, queues::MEDICATION_AUDIT).await, 1);
    assert_eq!(depth(&broker, queues::NOTIFICATION_MEDICATIONS).await, 1);
    assert_eq!(depth(&broker, queues::ANALYTICS_MEDICATIONS).await, 1);
    assert_eq!(depth(&broker, queues::AUDIT_MEDICATIONS).await, 1);
    assert_eq!(depth(&broker, queues::INTERACTION_AUDIT).await, 0);
}

#[tokio::test]
async fn unknown_exchange_is_rejected_without_side_effects() {
    let broker = canonical_broker().await;
    let publisher = EventPublisher::new(broker.clone());

    let outcome = publisher
        .publish("no-such-exchange", EventEnvelope::new("medication.created", serde_json::json!({})))
        .await;

    assert_eq!(
        outcome,
        DeliveryOutcome::Rejected(RejectReason::UnknownExchange("no-such-exchange".to_string()))
    );
    assert_eq!(depth(&broker, queues::MEDICATION_AUDIT).await, 0);
}

#[tokio::test]
async fn unavailable_broker_rejects_and_mirror_is_skipped() {
    let broker = canonical_broker().await;
    let publisher =
        EventPublisher::new(broker.clone()).with_mirror(exchanges::MEDICATIONS_FANOUT);
    broker.set_available(false);

    let outcome = publisher.publish_event(&created(2, false)).await.unwrap();

    assert!(matches!(
        outcome,
        DeliveryOutcome::Rejected(RejectReason::BrokerUnavailable(_))
    ));

    broker.set_available(true);
    assert_eq!(depth(&broker, queues::AUDIT_MEDICATIONS).await, 0);
}

#[tokio::test]
async fn publish_confirmed_callback_sees_final_outcome() {
    let broker = canonical_broker().await;
    let publisher = EventPublisher::new(broker.clone());
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

    let recorder = seen.clone();
    let envelope = created(3, false).to_envelope().unwrap();
    publisher
        .publish_confirmed(exchanges::MEDICATIONS, envelope, move |outcome| {
            recorder.lock().unwrap().push(outcome.clone());
        })
        .await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![DeliveryOutcome::Confirmed { routed: 3 }]
    );
}

// =============================================================================
// Consumers
// =============================================================================

#[tokio::test]
async fn analytics_worker_counts_routed_events() {
    let broker = canonical_broker().await;
    let publisher = EventPublisher::new(broker.clone());

    publisher.publish_event(&created(1, false)).await.unwrap();
    publisher
        .publish_event(&DrugInteractionChecked {
            medication_id: 1,
            medication_name: "Warfarin".to_string(),
            risk_level: 9,
            severity: Severity::High,
            contraindications: vec!["aspirin".to_string()],
            recommendation: "consult".to_string(),
        })
        .await
        .unwrap();
    for rating in [4, 5] {
        publisher
            .publish_event(&UserRated {
                user_id: "u1".to_string(),
                rating,
                verdict: "ok".to_string(),
            })
            .await
            .unwrap();
    }

    let analytics = Arc::new(AnalyticsConsumer::new());
    let medications = QueueWorker::new(broker.clone(), queues::ANALYTICS_MEDICATIONS, analytics.clone());
    let ratings = QueueWorker::new(broker.clone(), queues::ANALYTICS_RATINGS, analytics.clone());

    assert_eq!(
        medications.process_batch().await.unwrap(),
        BatchReport { acked: 2, ..Default::default() }
    );
    assert_eq!(ratings.process_batch().await.unwrap().acked, 2);

    let snapshot = analytics.snapshot().await;
    assert_eq!(snapshot.events_by_key.get("medication.created"), Some(&1));
    assert_eq!(snapshot.critical_interactions, 1);
    assert_eq!(snapshot.ratings, 2);
    assert_eq!(snapshot.average_rating, Some(4.5));
}

#[tokio::test]
async fn redelivered_duplicate_is_audited_once() {
    let broker = canonical_broker().await;
    let envelope = created(9, true).to_envelope().unwrap();

    broker.publish(exchanges::MEDICATIONS, envelope.clone()).await;
    broker.publish(exchanges::MEDICATIONS, envelope).await;

    let audit = Arc::new(AuditConsumer::new());
    let handler = IdempotentHandler::new(audit.clone(), Arc::new(InMemoryProcessedEventStore::new()));
    let worker = QueueWorker::new(broker.clone(), queues::MEDICATION_AUDIT, Arc::new(handler));

    let report = worker.process_batch().await.unwrap();

    assert_eq!(report.acked, 2);
    assert_eq!(audit.recorded(), 1);
    assert_eq!(depth(&broker, queues::MEDICATION_AUDIT).await, 0);
}

#[tokio::test]
async fn malformed_payload_is_dropped_not_requeued() {
    let broker = canonical_broker().await;
    broker
        .publish(
            exchanges::MEDICATIONS,
            EventEnvelope::new("medication.created", serde_json::json!({"unexpected": true})),
        )
        .await;

    let worker = QueueWorker::new(
        broker.clone(),
        queues::MEDICATION_AUDIT,
        Arc::new(AuditConsumer::new()),
    );
    let report = worker.process_batch().await.unwrap();

    assert_eq!(report, BatchReport { dropped: 1, ..Default::default() });
    assert_eq!(depth(&broker, queues::MEDICATION_AUDIT).await, 0);
    assert_eq!(worker.process_batch().await.unwrap(), BatchReport::default());
}

#[tokio::test]
async fn unknown_routing_key_drains_every_queue_it_reaches() {
    let broker = canonical_broker().await;
    let publisher =
        EventPublisher::new(broker.clone()).with_mirror(exchanges::MEDICATIONS_FANOUT);
    let outcome = publisher
        .publish(
            exchanges::MEDICATIONS,
            EventEnvelope::new("medication.archived", serde_json::json!({})),
        )
        .await;
    assert!(outcome.is_confirmed());

    let audit = Arc::new(AuditConsumer::new());
    let broadcaster = Arc::new(NotificationBroadcaster::new(Arc::new(ConnectionRegistry::new())));
    let workers = [
        QueueWorker::new(broker.clone(), queues::MEDICATION_AUDIT, audit.clone()),
        QueueWorker::new(broker.clone(), queues::AUDIT_MEDICATIONS, audit.clone()),
        QueueWorker::new(
            broker.clone(),
            queues::NOTIFICATION_MEDICATIONS,
            Arc::new(NotificationBridge::new(broadcaster)),
        ),
    ];

    for _ in 0..3 {
        for worker in &workers {
            worker.process_batch().await.unwrap();
        }
    }

    for worker in &workers {
        assert_eq!(depth(&broker, worker.queue()).await, 0, "{}", worker.queue());
        assert_eq!(broker.unacked_count(worker.queue()).await, 0);
    }
    assert_eq!(audit.recorded(), 2);
}
