//! Axum router for the notification and producer endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    broadcast, check_interaction, get_stats, health, publish_event, send_to_user,
    NotificationsAppState,
};

/// Create the router, suitable for nesting under `/api`.
///
/// # Routes
///
/// ## Notifications
/// - `GET /notifications/stats` - Registry counters and uptime
/// - `GET /notifications/health` - Liveness
/// - `POST /notifications/broadcast` - System message to every client
/// - `POST /notifications/send-to-user` - Personal message to one user
///
/// ## Producers
/// - `POST /interactions/check` - Score and publish an interaction check
/// - `POST /events/publish` - Publish a raw event to an exchange
pub fn notifications_router() -> Router<NotificationsAppState> {
    Router::new()
        .route("/notifications/stats", get(get_stats))
        .route("/notifications/health", get(health))
        .route("/notifications/broadcast", post(broadcast))
        .route("/notifications/send-to-user", post(send_to_user))
        .route("/interactions/check", post(check_interaction))
        .route("/events/publish", post(publish_event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::adapters::broker::InMemoryBroker;
    use crate::adapters::risk::HashRiskScorer;
    use crate::application::notifications::registry::testing::RecordingTransport;
    use crate::application::{
        declare_topology, ConnectionRegistry, EventPublisher, InteractionChecker,
        NotificationBroadcaster,
    };
    use crate::domain::foundation::UserId;
    use crate::domain::routing::{exchanges, queues, CanonicalTopology};
    use crate::ports::MessageBroker;

    struct Fixture {
        app: Router,
        registry: Arc<ConnectionRegistry>,
        broker: Arc<InMemoryBroker>,
    }

    async fn fixture() -> Fixture {
        let broker = Arc::new(InMemoryBroker::new());
        declare_topology(broker.as_ref(), &CanonicalTopology::standard())
            .await
            .unwrap();
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(NotificationBroadcaster::new(registry.clone()));
        let publisher = Arc::new(EventPublisher::new(broker.clone()));
        let checker = Arc::new(InteractionChecker::new(
            Arc::new(HashRiskScorer::new()),
            publisher.clone(),
        ));
        let state = NotificationsAppState::new(broadcaster, publisher, checker);
        Fixture {
            app: Router::new().nest("/api", notifications_router().with_state(state)),
            registry,
            broker,
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn stats_report_registry_counters() {
        let fx = fixture().await;
        fx.registry.register(RecordingTransport::new()).await;

        let (status, body) = send(&fx.app, "GET", "/api/notifications/stats", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activeConnections"], 1);
        assert_eq!(body["totalConnections"], 1);
        assert_eq!(body["service"], "medication-notification-service");
    }

    #[tokio::test]
    async fn health_is_up() {
        let fx = fixture().await;
        let (status, body) = send(&fx.app, "GET", "/api/notifications/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
    }

    #[tokio::test]
    async fn broadcast_reaches_every_client() {
        let fx = fixture().await;
        let a = RecordingTransport::new();
        let b = RecordingTransport::new();
        fx.registry.register(a.clone()).await;
        fx.registry.register(b.clone()).await;

        let (status, body) = send(
            &fx.app,
            "POST",
            "/api/notifications/broadcast",
            Some(json!({"message": "maintenance at noon", "level": "warning"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["delivered"], 2);
        assert!(a.frames()[0].contains("maintenance at noon"));
        assert!(b.frames()[0].contains("\"level\":\"warning\""));
    }

    #[tokio::test]
    async fn send_to_user_requires_user_id() {
        let fx = fixture().await;
        let (status, body) = send(
            &fx.app,
            "POST",
            "/api/notifications/send-to-user",
            Some(json!({"userId": "  ", "message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorCode"], "VALIDATION_FAILED");

        let (status, _) = send(
            &fx.app,
            "POST",
            "/api/notifications/send-to-user",
            Some(json!({"message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn send_to_user_delivers_to_bound_connection() {
        let fx = fixture().await;
        let transport = RecordingTransport::new();
        let id = fx.registry.register(transport.clone()).await;
        fx.registry.bind_user(id, UserId::new("u1").unwrap()).await;

        let (status, body) = send(
            &fx.app,
            "POST",
            "/api/notifications/send-to-user",
            Some(json!({"userId": "u1", "message": "your order is ready"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sent"], true);
        assert!(transport.frames()[0].contains("\"userId\":\"u1\""));
    }

    #[tokio::test]
    async fn send_to_unknown_user_is_a_warning() {
        let fx = fixture().await;
        let (status, body) = send(
            &fx.app,
            "POST",
            "/api/notifications/send-to-user",
            Some(json!({"userId": "ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "warning");
        assert_eq!(body["sent"], false);
    }

    #[tokio::test]
    async fn interaction_check_publishes_event() {
        let fx = fixture().await;
        let (status, body) = send(
            &fx.app,
            "POST",
            "/api/interactions/check",
            Some(json!({"medicationId": 4, "medicationName": "Ibuprofen"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let level = body["riskLevel"].as_u64().unwrap();
        assert!((1..=10).contains(&level));
        assert_eq!(
            fx.broker.queue_depth(queues::INTERACTION_AUDIT).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn publish_to_unknown_exchange_is_not_found() {
        let fx = fixture().await;
        let (status, _) = send(
            &fx.app,
            "POST",
            "/api/events/publish",
            Some(json!({"exchange": "nowhere", "routingKey": "medication.created"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn publish_routes_by_key() {
        let fx = fixture().await;
        let (status, body) = send(
            &fx.app,
            "POST",
            "/api/events/publish",
            Some(json!({
                "exchange": exchanges::MEDICATIONS,
                "routingKey": "medication.deleted",
                "payload": {"medicationId": 1, "medicationName": "X"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        // medication-audit-queue and q.notification.medications
        assert_eq!(body["routed"], 2);
    }
}
