//! HTTP handlers for notification and producer endpoints.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::interaction::CheckInteractionError;
use crate::application::{
    CheckInteractionCommand, EventPublisher, InteractionChecker, NotificationBroadcaster,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::notification::Notification;
use crate::domain::routing::{DeliveryOutcome, EventEnvelope, RejectReason};

use super::dto::{
    BroadcastRequest, BroadcastResponse, CheckInteractionRequest, ErrorResponse, HealthResponse,
    InteractionCheckResponse, PublishEventRequest, PublishResponse, SendToUserRequest,
    SendToUserResponse, StatsResponse, SERVICE_NAME,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct NotificationsAppState {
    pub broadcaster: Arc<NotificationBroadcaster>,
    pub publisher: Arc<EventPublisher>,
    pub interaction_checker: Arc<InteractionChecker>,
    pub started_at: Timestamp,
}

impl NotificationsAppState {
    pub fn new(
        broadcaster: Arc<NotificationBroadcaster>,
        publisher: Arc<EventPublisher>,
        interaction_checker: Arc<InteractionChecker>,
    ) -> Self {
        Self {
            broadcaster,
            publisher,
            interaction_checker,
            started_at: Timestamp::now(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /notifications/stats
pub async fn get_stats(State(state): State<NotificationsAppState>) -> impl IntoResponse {
    let stats = state.broadcaster.registry().stats().await;

    Json(StatsResponse {
        status: "success",
        service: SERVICE_NAME,
        stats,
        uptime_secs: uptime_secs(&state.started_at, &Timestamp::now()),
    })
}

/// Whole seconds between `started_at` and `now`, zero if the clock went backwards.
fn uptime_secs(started_at: &Timestamp, now: &Timestamp) -> u64 {
    u64::try_from(now.duration_since(started_at).num_seconds()).unwrap_or(0)
}

/// GET /notifications/health
pub async fn health(State(state): State<NotificationsAppState>) -> impl IntoResponse {
    let stats = state.broadcaster.registry().stats().await;
    Json(HealthResponse {
        status: "UP",
        service: SERVICE_NAME,
        active_connections: stats.active_connections,
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /notifications/broadcast - system message to every client
pub async fn broadcast(
    State(state): State<NotificationsAppState>,
    Json(request): Json<BroadcastRequest>,
) -> impl IntoResponse {
    let notification = Notification::system(request.message.clone(), request.level.clone());
    let delivered = state.broadcaster.broadcast(&notification).await;

    Json(BroadcastResponse {
        status: "success",
        content: request.message,
        level: request.level,
        delivered,
    })
}

/// POST /notifications/send-to-user - personal message to one identified user
pub async fn send_to_user(
    State(state): State<NotificationsAppState>,
    Json(request): Json<SendToUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = request
        .user_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))
        .and_then(|raw| UserId::new(raw).map_err(|e| ApiError::BadRequest(e.to_string())))?;

    let notification = Notification::system(request.message, "personal")
        .with_data(serde_json::json!({ "userId": user_id.as_str() }));
    let sent = state.broadcaster.send_to_user(&user_id, &notification).await;

    Ok(Json(SendToUserResponse {
        status: if sent { "success" } else { "warning" },
        user_id: user_id.to_string(),
        sent,
    }))
}

/// POST /interactions/check - score a medication and publish the result
pub async fn check_interaction(
    State(state): State<NotificationsAppState>,
    Json(request): Json<CheckInteractionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CheckInteractionCommand {
        medication_id: request.medication_id,
        medication_name: request.medication_name,
    };

    let result = state.interaction_checker.handle(cmd).await?;
    Ok(Json(InteractionCheckResponse::from(result)))
}

/// POST /events/publish - raw producer entry point
pub async fn publish_event(
    State(state): State<NotificationsAppState>,
    Json(request): Json<PublishEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.routing_key.trim().is_empty() {
        return Err(ApiError::BadRequest("routingKey is required".to_string()));
    }

    let mut envelope = EventEnvelope::new(request.routing_key, request.payload);
    if let Some(correlation_id) = request.correlation_id {
        envelope = envelope.with_correlation_id(correlation_id);
    }
    let event_id = envelope.event_id.as_str().to_string();

    match state.publisher.publish(&request.exchange, envelope).await {
        outcome @ DeliveryOutcome::Confirmed { .. } => {
            Ok((StatusCode::ACCEPTED, Json(PublishResponse::new(event_id, &outcome))))
        }
        DeliveryOutcome::Rejected(reason) => Err(reason.into()),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts application errors to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl From<RejectReason> for ApiError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::UnknownExchange(_) => ApiError::NotFound(reason.to_string()),
            RejectReason::BrokerUnavailable(_) => ApiError::Unavailable(reason.to_string()),
        }
    }
}

impl From<CheckInteractionError> for ApiError {
    fn from(err: CheckInteractionError) -> Self {
        match err {
            CheckInteractionError::Validation(e) => ApiError::BadRequest(e.to_string()),
            CheckInteractionError::Encoding(e) => ApiError::Internal(e.to_string()),
            CheckInteractionError::Rejected(reason) => reason.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "NOT_FOUND", m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, "BROKER_UNAVAILABLE", m),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "Internal error in notification API");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", m)
            }
        };
        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}
