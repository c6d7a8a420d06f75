//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application services and the outside world. Adapters implement
//! these ports.
//!
//! ## Routing Ports
//!
//! - `MessageBroker` - Exchange/queue topology, publish and consume
//! - `QueueHandler` - Consumer logic invoked for each delivery
//! - `ProcessedEventStore` - Idempotency tracking for queue handlers
//!
//! ## Push Ports
//!
//! - `ConnectionTransport` - Outbound half of one client connection
//!
//! ## Scoring Ports
//!
//! - `RiskScorer` - Interaction risk assessment for a medication

mod connection_transport;
mod message_broker;
mod processed_event_store;
mod queue_handler;
mod risk_scorer;

pub use connection_transport::{ConnectionTransport, TransportError};
pub use message_broker::{BrokerError, MessageBroker};
pub use processed_event_store::ProcessedEventStore;
pub use queue_handler::QueueHandler;
pub use risk_scorer::RiskScorer;
