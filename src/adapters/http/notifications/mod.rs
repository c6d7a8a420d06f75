//! HTTP adapter for the notification service's administrative surface.
//!
//! Thin pass-throughs onto the registry, broadcaster, publisher and
//! interaction checker; this module holds no state of its own.

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::{ApiError, NotificationsAppState};
pub use routes::notifications_router;
