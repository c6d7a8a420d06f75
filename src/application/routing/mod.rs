//! Producer-side routing: topology bootstrap and event publishing.

mod bootstrap;
mod publisher;

pub use bootstrap::declare_topology;
pub use publisher::EventPublisher;
