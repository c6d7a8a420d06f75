//! Message broker configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Which `MessageBroker` implementation to run.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerBackend {
    #[default]
    Memory,
    Redis,
}

/// Broker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub backend: BrokerBackend,

    /// Redis connection URL; may carry credentials
    pub redis_url: Option<SecretString>,

    /// Namespace for every Redis key the broker touches
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Consumer poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum deliveries per consumer poll
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Redeliveries of a failing event before a consumer drops it
    #[serde(default = "default_max_redeliveries")]
    pub max_redeliveries: u32,
}

impl BrokerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate broker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backend == BrokerBackend::Redis {
            let url = self
                .redis_url
                .as_ref()
                .map(|u| u.expose_secret().as_str())
                .unwrap_or_default();
            if url.is_empty() {
                return Err(ValidationError::MissingRequired("BROKER__REDIS_URL"));
            }
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(ValidationError::InvalidRedisUrl);
            }
        }
        if self.key_prefix.trim().is_empty() {
            return Err(ValidationError::BlankKeyPrefix);
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > 60_000 {
            return Err(ValidationError::InvalidPollInterval);
        }
        if self.batch_size == 0 || self.batch_size > 10_000 {
            return Err(ValidationError::InvalidBatchSize);
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            backend: BrokerBackend::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
            max_redeliveries: default_max_redeliveries(),
        }
    }
}

fn default_key_prefix() -> String {
    "pharma-relay".to_string()
}

fn default_poll_interval() -> u64 {
    100
}

fn default_batch_size() -> u32 {
    100
}

fn default_max_redeliveries() -> u32 {
    5
}
