//! WebSocket endpoint configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Route the upgrade handler is mounted on
    #[serde(default = "default_path")]
    pub path: String,

    /// Seconds between liveness pings
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Send a welcome system message on connect
    #[serde(default = "default_welcome_message")]
    pub welcome_message: bool,
}

impl WebSocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.path.starts_with('/') {
            return Err(ValidationError::InvalidWebSocketPath);
        }
        if self.heartbeat_interval_secs == 0 || self.heartbeat_interval_secs > 3600 {
            return Err(ValidationError::InvalidHeartbeatInterval);
        }
        Ok(())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            welcome_message: default_welcome_message(),
        }
    }
}

fn default_path() -> String {
    "/ws/medications".to_string()
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_welcome_message() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_defaults() {
        let config = WebSocketConfig::default();
        assert_eq!(config.path, "/ws/medications");
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert!(config.welcome_message);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_relative_path_is_invalid() {
        let config = WebSocketConfig {
            path: "ws".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidWebSocketPath));
    }

    #[test]
    fn test_zero_heartbeat_is_invalid() {
        let config = WebSocketConfig {
            heartbeat_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidHeartbeatInterval)
        );
    }
}
