//! Application layer - services that orchestrate domain types over ports.
//!
//! - `routing` - Topology bootstrap and the producer-side publisher
//! - `notifications` - Connection registry, broadcaster, command dispatcher
//! - `interaction` - Interaction risk checks

pub mod interaction;
pub mod notifications;
pub mod routing;

pub use interaction::{CheckInteractionCommand, CheckInteractionResult, InteractionChecker};
pub use notifications::{
    CommandDispatcher, ConnectionRegistry, NotificationBroadcaster, NotifyReport, RegistryStats,
};
pub use routing::{declare_topology, EventPublisher};
