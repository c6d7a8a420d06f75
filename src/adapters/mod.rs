//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `broker` - Message broker backends (in-memory, Redis)
//! - `events` - Queue workers and idempotent handling
//! - `consumers` - Audit and analytics queue handlers
//! - `risk` - Risk scorer implementations
//! - `websocket` - Client connections, heartbeat, event bridge
//! - `http` - Administrative REST endpoints

pub mod broker;
pub mod consumers;
pub mod events;
pub mod http;
pub mod risk;
pub mod websocket;

pub use broker::{InMemoryBroker, RedisBroker};
pub use events::{IdempotentHandler, QueueWorker, QueueWorkerConfig};
