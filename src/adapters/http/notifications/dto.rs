//! HTTP DTOs for the notification endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::application::{CheckInteractionResult, RegistryStats};
use crate::domain::medication::Severity;
use crate::domain::routing::DeliveryOutcome;

pub const SERVICE_NAME: &str = "medication-notification-service";

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /notifications/broadcast`.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastRequest {
    #[serde(default = "default_broadcast_message")]
    pub message: String,
    #[serde(default = "default_level")]
    pub level: String,
}

/// Body of `POST /notifications/send-to-user`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToUserRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_personal_message")]
    pub message: String,
}

/// Body of `POST /interactions/check`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInteractionRequest {
    pub medication_id: i64,
    pub medication_name: String,
}

/// Body of `POST /events/publish`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishEventRequest {
    pub exchange: String,
    pub routing_key: String,
    #[serde(default)]
    pub payload: JsonValue,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

fn default_broadcast_message() -> String {
    "System notification".to_string()
}

fn default_personal_message() -> String {
    "Personal notification".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub status: &'static str,
    pub service: &'static str,
    #[serde(flatten)]
    pub stats: RegistryStats,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub active_connections: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub status: &'static str,
    pub content: String,
    pub level: String,
    pub delivered: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToUserResponse {
    /// `success` when delivered, `warning` when no open connection is bound.
    pub status: &'static str,
    pub user_id: String,
    pub sent: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionCheckResponse {
    pub medication_id: i64,
    pub medication_name: String,
    pub risk_level: u8,
    pub severity: Severity,
    pub contraindications: Vec<String>,
    pub recommendation: String,
    pub routed: usize,
}

impl From<CheckInteractionResult> for InteractionCheckResponse {
    fn from(result: CheckInteractionResult) -> Self {
        let event = result.event;
        Self {
            medication_id: event.medication_id,
            medication_name: event.medication_name,
            risk_level: event.risk_level,
            severity: event.severity,
            contraindications: event.contraindications,
            recommendation: event.recommendation,
            routed: result.routed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub event_id: String,
    pub routed: usize,
}

impl PublishResponse {
    pub fn new(event_id: impl Into<String>, outcome: &DeliveryOutcome) -> Self {
        Self {
            event_id: event_id.into(),
            routed: outcome.routed(),
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
