//! Flat JSON rendering: `{"type", "timestamp", "priority", ...fields}`.

use serde::Serialize;
use thiserror::Error;

use super::{Notification, Priority};
use crate::domain::foundation::Timestamp;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize notification: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct WireMessage<'a> {
    #[serde(rename = "type")]
    tag: &'static str,
    timestamp: String,
    priority: Priority,
    #[serde(flatten)]
    body: &'a Notification,
}

/// Renders a notification as sent to clients. `at` supplies the HH:MM:SS
/// timestamp (UTC).
pub fn render(notification: &Notification, at: Timestamp) -> Result<String, RenderError> {
    let message = WireMessage {
        tag: notification.tag(),
        timestamp: at.clock_time(),
        priority: notification.priority(),
        body: notification,
    };
    Ok(serde_json::to_string(&message)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::medication::{DrugInteractionChecked, MedicationCreated, Severity};
    use serde_json::Value;

    fn at() -> Timestamp {
        // 2024-01-01T13:05:09Z
        Timestamp::from_unix_secs(1_704_114_309)
    }

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn medication_created_renders_flat_camel_case() {
        let notification = Notification::medication_created(&MedicationCreated {
            medication_id: 12,
            medication_name: "Ibuprofen".to_string(),
            inn: "ibuprofen".to_string(),
            manufacturer_name: None,
            prescription_required: false,
        });

        let json = parse(&render(&notification, at()).unwrap());
        assert_eq!(json["type"], "medication-created");
        assert_eq!(json["timestamp"], "13:05:09");
        assert_eq!(json["priority"], "normal");
        assert_eq!(json["medicationId"], 12);
        assert_eq!(json["medicationName"], "Ibuprofen");
    }

    #[test]
    fn interaction_renders_risk_fields() {
        let notification = Notification::interaction_checked(&DrugInteractionChecked {
            medication_id: 4,
            medication_name: "Warfarin".to_string(),
            risk_level: 9,
            severity: Severity::High,
            contraindications: vec![],
            recommendation: "consult a physician".to_string(),
        });

        let json = parse(&render(&notification, at()).unwrap());
        assert_eq!(json["type"], "drug-interaction");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["riskLevel"], 9);
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["recommendation"], "consult a physician");
    }

    #[test]
    fn system_kind_never_leaks_into_fields() {
        let json = parse(&render(&Notification::critical_alert("boom"), at()).unwrap());
        assert_eq!(json["type"], "critical-alert");
        assert_eq!(json["level"], "critical");
        assert!(json.get("kind").is_none());
        assert!(json.get("data").is_none());
    }

    #[test]
    fn quotes_and_control_characters_are_escaped() {
        let notification = Notification::system("say \"hi\"\n\tthen\\leave\u{1}", "info");
        let text = render(&notification, at()).unwrap();

        assert!(!text.contains('\n'));
        assert!(!text.contains('\u{1}'));
        assert_eq!(parse(&text)["message"], "say \"hi\"\n\tthen\\leave\u{1}");
    }

    #[test]
    fn stats_reply_uses_camel_case_counters() {
        let json = parse(&render(&Notification::stats(3, 10, 2, at()), at()).unwrap());
        assert_eq!(json["type"], "stats");
        assert_eq!(json["activeConnections"], 3);
        assert_eq!(json["totalConnections"], 10);
        assert_eq!(json["identifiedUsers"], 2);
        assert_eq!(json["serverTime"], 1_704_114_309_000i64);
    }

    #[test]
    fn help_reply_lists_catalog() {
        let json = parse(&render(&Notification::help(), at()).unwrap());
        assert!(json["commands"].as_array().unwrap().len() >= 3);
        assert!(json["supportedEvents"].as_array().unwrap().len() >= 6);
    }
}
