//! HTTP adapters - REST API implementations.

pub mod middleware;
pub mod notifications;

pub use middleware::with_http_layers;
pub use notifications::{notifications_router, NotificationsAppState};
