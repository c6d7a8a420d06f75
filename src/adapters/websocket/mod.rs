//! WebSocket adapters for real-time notification delivery.
//!
//! # Components
//!
//! - [`transport`] - `ConnectionTransport` over an axum WebSocket
//! - [`handler`] - Axum upgrade handler and per-connection loop
//! - [`heartbeat`] - Periodic liveness pings
//! - [`event_bridge`] - Queue consumer pushing routed events to clients

pub mod event_bridge;
pub mod handler;
pub mod heartbeat;
pub mod transport;

pub use event_bridge::NotificationBridge;
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use heartbeat::start_heartbeat;
pub use transport::WebSocketTransport;
