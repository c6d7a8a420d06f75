//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `PHARMA_RELAY` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use pharma_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod broker;
mod error;
mod server;
mod websocket;

pub use broker::{BrokerBackend, BrokerConfig};
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, LogFormat, ServerConfig};
pub use websocket::WebSocketConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// in-memory setup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (bind address, logging, HTTP timeouts)
    #[serde(default)]
    pub server: ServerConfig,

    /// Broker backend and consumer tuning
    #[serde(default)]
    pub broker: BrokerConfig,

    /// WebSocket endpoint settings
    #[serde(default)]
    pub websocket: WebSocketConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PHARMA_RELAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `PHARMA_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PHARMA_RELAY__BROKER__BACKEND=redis` -> `broker.backend = redis`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PHARMA_RELAY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.broker.validate()?;
        self.websocket.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
