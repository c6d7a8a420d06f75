//! MessageBroker port - Interface to the durable pub/sub provider.
//!
//! The broker owns the exchange/queue topology and stores queued copies.
//! Producers only see [`MessageBroker::publish`]; consumers pull with
//! [`MessageBroker::fetch`] and settle each delivery with `ack` or
//! `requeue` (at-least-once).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::routing::{
    Binding, Delivery, DeliveryOutcome, EventEnvelope, ExchangeSpec, QueueSpec, TopologyError,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("unknown delivery {tag} on queue '{queue}'")]
    UnknownDelivery { queue: String, tag: u64 },

    #[error("stored message is not a valid envelope: {0}")]
    CorruptMessage(String),
}

#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Declares an exchange. Idempotent for identical attributes.
    async fn declare_exchange(&self, spec: ExchangeSpec) -> Result<(), BrokerError>;

    /// Declares a queue. Idempotent for identical attributes.
    async fn declare_queue(&self, spec: QueueSpec) -> Result<(), BrokerError>;

    /// Binds a queue to an exchange. Duplicate bindings are no-ops.
    async fn bind(&self, binding: Binding) -> Result<(), BrokerError>;

    /// Routes one envelope and stores a copy in every selected queue.
    ///
    /// Returns only once every copy is stored. No matching binding is not
    /// an error: the envelope is dropped and `Confirmed { routed: 0 }`
    /// returned.
    async fn publish(&self, exchange: &str, envelope: EventEnvelope) -> DeliveryOutcome;

    /// Takes the next message off a queue, if any.
    async fn fetch(&self, queue: &str) -> Result<Option<Delivery>, BrokerError>;

    /// Settles a delivery; it will not be delivered again.
    async fn ack(&self, delivery: &Delivery) -> Result<(), BrokerError>;

    /// Returns a delivery to its queue, marked as redelivered.
    async fn requeue(&self, delivery: &Delivery) -> Result<(), BrokerError>;

    /// Number of ready (unfetched) messages in a queue.
    async fn queue_depth(&self, queue: &str) -> Result<usize, BrokerError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
