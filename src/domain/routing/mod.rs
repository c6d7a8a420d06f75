//! Routing model - exchanges, queues, bindings and the envelopes they carry.
//!
//! The model is broker-agnostic: both broker adapters resolve publishes
//! through [`Topology::route`], so topic matching and fan-out behave the
//! same whichever backend holds the queues.

mod canonical;
mod envelope;
mod pattern;
mod topology;

pub use canonical::{exchanges, queues, routing_keys, CanonicalTopology};
pub use envelope::{Delivery, DeliveryOutcome, EventEnvelope, EventMetadata, RejectReason};
pub use pattern::RoutingPattern;
pub use topology::{Binding, ExchangeKind, ExchangeSpec, QueueSpec, Topology, TopologyError};
