//! Notification union.
//!
//! Every variant wraps a named-field struct whose fields become camelCase
//! keys of the flat wire object. The discriminating `type` tag, the
//! `timestamp` and the `priority` are added by [`super::render`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::Timestamp;
use crate::domain::medication::{
    CatalogEvent, DrugInteractionChecked, MedicationCreated, MedicationDeleted, MedicationExpiring,
    MedicationUpdated, Severity, StockLevelLow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// Which tag a [`SystemNotice`] is sent under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemKind {
    System,
    CriticalAlert,
}

impl SystemKind {
    pub fn tag(&self) -> &'static str {
        match self {
            SystemKind::System => "system",
            SystemKind::CriticalAlert => "critical-alert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationNotice {
    pub medication_id: i64,
    pub medication_name: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionNotice {
    pub medication_id: i64,
    pub medication_name: String,
    pub title: String,
    pub risk_info: String,
    pub risk_level: u8,
    pub severity: Severity,
    pub recommendation: String,
}

impl InteractionNotice {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::High || self.risk_level > 7
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationNotice {
    pub medication_id: i64,
    pub medication_name: String,
    pub message: String,
    pub level: String,
    pub expiration_date: String,
    pub days_left: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockNotice {
    pub medication_id: i64,
    pub medication_name: String,
    pub message: String,
    pub level: String,
    pub current_stock: u32,
    pub min_stock: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNotice {
    #[serde(skip)]
    pub kind: SystemKind,
    pub message: String,
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PongNotice {
    pub message: String,
    pub server_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsNotice {
    pub active_connections: usize,
    pub total_connections: u64,
    pub identified_users: usize,
    pub server_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpNotice {
    pub commands: Vec<String>,
    pub supported_events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Notification {
    MedicationCreated(MedicationNotice),
    MedicationUpdated(MedicationNotice),
    MedicationDeleted(MedicationNotice),
    InteractionChecked(InteractionNotice),
    ExpirationWarning(ExpirationNotice),
    LowStock(StockNotice),
    SystemMessage(SystemNotice),
    PongReply(PongNotice),
    StatsReply(StatsNotice),
    HelpReply(HelpNotice),
}

impl Notification {
    /// The wire `type` tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Notification::MedicationCreated(_) => "medication-created",
            Notification::MedicationUpdated(_) => "medication-updated",
            Notification::MedicationDeleted(_) => "medication-deleted",
            Notification::InteractionChecked(_) => "drug-interaction",
            Notification::ExpirationWarning(_) => "expiration-warning",
            Notification::LowStock(_) => "low-stock",
            Notification::SystemMessage(notice) => notice.kind.tag(),
            Notification::PongReply(_) => "pong",
            Notification::StatsReply(_) => "stats",
            Notification::HelpReply(_) => "help",
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Notification::InteractionChecked(notice) if notice.severity == Severity::High => {
                Priority::High
            }
            Notification::SystemMessage(SystemNotice {
                kind: SystemKind::CriticalAlert,
                ..
            }) => Priority::High,
            _ => Priority::Normal,
        }
    }

    /// The follow-up alert owed to every client after this notification,
    /// if any. Only critical interaction checks escalate.
    pub fn escalation(&self) -> Option<Notification> {
        match self {
            Notification::InteractionChecked(notice) if notice.is_critical() => {
                Some(Notification::critical_alert(format!(
                    "CRITICAL INTERACTION: {}",
                    notice.medication_name
                )))
            }
            _ => None,
        }
    }

    /// The notification clients receive for a routed catalog event.
    /// Ratings are analytics-only and produce none.
    pub fn from_catalog_event(event: &CatalogEvent) -> Option<Self> {
        match event {
            CatalogEvent::Created(e) => Some(Self::medication_created(e)),
            CatalogEvent::Updated(e) => Some(Self::medication_updated(e)),
            CatalogEvent::Deleted(e) => Some(Self::medication_deleted(e)),
            CatalogEvent::Expiring(e) => Some(Self::expiration_warning(e)),
            CatalogEvent::LowStock(e) => Some(Self::low_stock(e)),
            CatalogEvent::InteractionChecked(e) => Some(Self::interaction_checked(e)),
            CatalogEvent::Rated(_) => None,
        }
    }

    pub fn medication_created(event: &MedicationCreated) -> Self {
        Notification::MedicationCreated(MedicationNotice {
            medication_id: event.medication_id,
            medication_name: event.medication_name.clone(),
            title: format!("{} added to the catalog", event.medication_name),
            description: format!("INN: {} | ID: {}", event.inn, event.medication_id),
        })
    }

    pub fn medication_updated(event: &MedicationUpdated) -> Self {
        let previous_name = event.previous_name.as_deref().unwrap_or(&event.medication_name);
        let previous_inn = event.previous_inn.as_deref().unwrap_or(&event.inn);
        Notification::MedicationUpdated(MedicationNotice {
            medication_id: event.medication_id,
            medication_name: event.medication_name.clone(),
            title: format!("{} -> {}", previous_name, event.medication_name),
            description: format!(
                "INN: {} -> {} | ID: {}",
                previous_inn, event.inn, event.medication_id
            ),
        })
    }

    pub fn medication_deleted(event: &MedicationDeleted) -> Self {
        let manufacturer = event.manufacturer_name.as_deref().unwrap_or("unknown");
        Notification::MedicationDeleted(MedicationNotice {
            medication_id: event.medication_id,
            medication_name: event.medication_name.clone(),
            title: format!("{} removed from the catalog", event.medication_name),
            description: format!(
                "INN: {} | Manufacturer: {} | ID: {}",
                event.inn, manufacturer, event.medication_id
            ),
        })
    }

    pub fn interaction_checked(event: &DrugInteractionChecked) -> Self {
        Notification::InteractionChecked(InteractionNotice {
            medication_id: event.medication_id,
            medication_name: event.medication_name.clone(),
            title: format!("Interaction check: {}", event.medication_name),
            risk_info: format!("Risk level: {}/10 ({})", event.risk_level, event.severity),
            risk_level: event.risk_level,
            severity: event.severity,
            recommendation: event.recommendation.clone(),
        })
    }

    pub fn expiration_warning(event: &MedicationExpiring) -> Self {
        Notification::ExpirationWarning(ExpirationNotice {
            medication_id: event.medication_id,
            medication_name: event.medication_name.clone(),
            message: format!("Expiration approaching: {}", event.medication_name),
            level: "warning".to_string(),
            expiration_date: event.expiration_date.to_string(),
            days_left: event.days_left,
        })
    }

    pub fn low_stock(event: &StockLevelLow) -> Self {
        Notification::LowStock(StockNotice {
            medication_id: event.medication_id,
            medication_name: event.medication_name.clone(),
            message: format!("Low stock: {}", event.medication_name),
            level: "warning".to_string(),
            current_stock: event.current_stock,
            min_stock: event.min_stock,
        })
    }

    pub fn system(message: impl Into<String>, level: impl Into<String>) -> Self {
        Notification::SystemMessage(SystemNotice {
            kind: SystemKind::System,
            message: message.into(),
            level: level.into(),
            data: None,
        })
    }

    pub fn critical_alert(message: impl Into<String>) -> Self {
        Notification::SystemMessage(SystemNotice {
            kind: SystemKind::CriticalAlert,
            message: message.into(),
            level: "critical".to_string(),
            data: None,
        })
    }

    /// Attaches a `data` object to a system-family notification. Other
    /// variants are returned unchanged.
    pub fn with_data(mut self, data: JsonValue) -> Self {
        if let Notification::SystemMessage(ref mut notice) = self {
            notice.data = Some(data);
        }
        self
    }

    pub fn pong(at: Timestamp) -> Self {
        Notification::PongReply(PongNotice {
            message: "pong".to_string(),
            server_time: at.as_unix_millis(),
        })
    }

    pub fn stats(
        active_connections: usize,
        total_connections: u64,
        identified_users: usize,
        at: Timestamp,
    ) -> Self {
        Notification::StatsReply(StatsNotice {
            active_connections,
            total_connections,
            identified_users,
            server_time: at.as_unix_millis(),
        })
    }

    /// Command and event catalog sent in reply to `help`.
    pub fn help() -> Self {
        let commands = [
            "ping - connection check",
            "stats - connection statistics",
            "identify - bind a userId to this connection",
            "help - this catalog",
        ];
        let events = [
            "medication-created - new medications",
            "medication-updated - catalog updates",
            "medication-deleted - removals",
            "drug-interaction - interaction checks",
            "expiration-warning - approaching expiration",
            "low-stock - stock below minimum",
        ];
        Notification::HelpReply(HelpNotice {
            commands: commands.iter().map(|s| s.to_string()).collect(),
            supported_events: events.iter().map(|s| s.to_string()).collect(),
        })
    }
}
