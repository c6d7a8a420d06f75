//! Real-time push: connection registry, broadcaster and command dispatcher.

mod broadcaster;
mod dispatcher;
pub(crate) mod registry;

pub use broadcaster::{NotificationBroadcaster, NotifyReport};
pub use dispatcher::CommandDispatcher;
pub use registry::{Connection, ConnectionRegistry, RegistryStats};
