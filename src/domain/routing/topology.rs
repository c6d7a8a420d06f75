//! Exchange/queue/binding topology and route resolution.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::RoutingPattern;

/// How an exchange selects target queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    /// Delivers to queues whose binding pattern matches the routing key.
    Topic,
    /// Delivers to every bound queue; patterns are ignored.
    Fanout,
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeKind::Topic => write!(f, "topic"),
            ExchangeKind::Fanout => write!(f, "fanout"),
        }
    }
}

impl FromStr for ExchangeKind {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "topic" => Ok(ExchangeKind::Topic),
            "fanout" => Ok(ExchangeKind::Fanout),
            other => Err(TopologyError::UnsupportedKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSpec {
    pub name: String,
    pub kind: ExchangeKind,
    pub durable: bool,
}

impl ExchangeSpec {
    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExchangeKind::Topic,
            durable: true,
        }
    }

    pub fn fanout(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExchangeKind::Fanout,
            durable: true,
        }
    }

    pub fn transient(mut self) -> Self {
        self.durable = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
}

impl QueueSpec {
    pub fn durable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
        }
    }

    pub fn transient(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: false,
        }
    }
}

/// Links a queue to an exchange under a routing pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub exchange: String,
    pub queue: String,
    pub pattern: RoutingPattern,
}

impl Binding {
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        pattern: impl Into<RoutingPattern>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            pattern: pattern.into(),
        }
    }

    /// Binding for a fanout exchange; the pattern is never consulted.
    pub fn fanout(exchange: impl Into<String>, queue: impl Into<String>) -> Self {
        Self::new(exchange, queue, RoutingPattern::match_all())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("exchange not found: {0}")]
    ExchangeNotFound(String),

    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("precondition failed for '{name}': {reason}")]
    PreconditionFailed { name: String, reason: String },

    #[error("unsupported exchange kind: {0}")]
    UnsupportedKind(String),
}

/// Declared exchanges, queues and bindings.
///
/// Declarations are idempotent. Re-declaring a name with different
/// attributes fails with [`TopologyError::PreconditionFailed`] and leaves the
/// existing declaration untouched.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    exchanges: HashMap<String, ExchangeSpec>,
    queues: HashMap<String, QueueSpec>,
    bindings: HashMap<String, Vec<Binding>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the exchange was newly created.
    pub fn declare_exchange(&mut self, spec: ExchangeSpec) -> Result<bool, TopologyError> {
        match self.exchanges.get(&spec.name) {
            Some(existing) if *existing == spec => Ok(false),
            Some(existing) => Err(TopologyError::PreconditionFailed {
                name: spec.name.clone(),
                reason: format!(
                    "declared as {} (durable={}), requested {} (durable={})",
                    existing.kind, existing.durable, spec.kind, spec.durable
                ),
            }),
            None => {
                self.exchanges.insert(spec.name.clone(), spec);
                Ok(true)
            }
        }
    }

    /// Returns `true` when the queue was newly created.
    pub fn declare_queue(&mut self, spec: QueueSpec) -> Result<bool, TopologyError> {
        match self.queues.get(&spec.name) {
            Some(existing) if *existing == spec => Ok(false),
            Some(existing) => Err(TopologyError::PreconditionFailed {
                name: spec.name.clone(),
                reason: format!(
                    "declared with durable={}, requested durable={}",
                    existing.durable, spec.durable
                ),
            }),
            None => {
                self.queues.insert(spec.name.clone(), spec);
                Ok(true)
            }
        }
    }

    /// Returns `true` when the binding was newly added.
    pub fn bind(&mut self, binding: Binding) -> Result<bool, TopologyError> {
        if !self.exchanges.contains_key(&binding.exchange) {
            return Err(TopologyError::ExchangeNotFound(binding.exchange));
        }
        if !self.queues.contains_key(&binding.queue) {
            return Err(TopologyError::QueueNotFound(binding.queue));
        }

        let bindings = self.bindings.entry(binding.exchange.clone()).or_default();
        if bindings.contains(&binding) {
            return Ok(false);
        }
        bindings.push(binding);
        Ok(true)
    }

    /// Resolves the queues that receive a copy of a message published to
    /// `exchange` with `routing_key`.
    ///
    /// Each queue appears at most once, in binding order. An exchange without
    /// matching bindings yields an empty list.
    pub fn route(&self, exchange: &str, routing_key: &str) -> Result<Vec<String>, TopologyError> {
        let spec = self
            .exchanges
            .get(exchange)
            .ok_or_else(|| TopologyError::ExchangeNotFound(exchange.to_string()))?;

        let mut targets: Vec<String> = Vec::new();
        for binding in self.bindings.get(exchange).into_iter().flatten() {
            let selected = match spec.kind {
                ExchangeKind::Fanout => true,
                ExchangeKind::Topic => binding.pattern.matches(routing_key),
            };
            if selected && !targets.contains(&binding.queue) {
                targets.push(binding.queue.clone());
            }
        }
        Ok(targets)
    }

    pub fn exchange(&self, name: &str) -> Option<&ExchangeSpec> {
        self.exchanges.get(name)
    }

    pub fn queue(&self, name: &str) -> Option<&QueueSpec> {
        self.queues.get(name)
    }

    pub fn has_queue(&self, name: &str) -> bool {
        self.queues.contains_key(name)
    }

    pub fn bindings_for(&self, exchange: &str) -> &[Binding] {
        self.bindings.get(exchange).map(Vec::as_slice).unwrap_or(&[])
    }
}
