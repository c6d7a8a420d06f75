//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Broker key prefix must not be blank")]
    BlankKeyPrefix,

    #[error("Consumer poll interval must be between 1ms and 60s")]
    InvalidPollInterval,

    #[error("Consumer batch size must be between 1 and 10000")]
    InvalidBatchSize,

    #[error("WebSocket path must start with '/'")]
    InvalidWebSocketPath,

    #[error("Heartbeat interval must be between 1s and 3600s")]
    InvalidHeartbeatInterval,
}
