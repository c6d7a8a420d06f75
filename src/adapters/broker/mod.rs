//! MessageBroker adapters.
//!
//! - `InMemoryBroker` - Process-local queues (default, tests)
//! - `RedisBroker` - Redis lists as durable queues

mod in_memory;
mod redis;

pub use self::redis::RedisBroker;
pub use in_memory::InMemoryBroker;
