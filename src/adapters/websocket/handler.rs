//! WebSocket upgrade handler for the notification endpoint.
//!
//! Connection lifecycle:
//! 1. Upgrade and register the send half with the connection registry
//! 2. Send the welcome message (if enabled)
//! 3. Dispatch inbound text frames as client commands
//! 4. Unregister on close, receive error, or eviction

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::StreamExt;

use super::transport::WebSocketTransport;
use crate::application::{CommandDispatcher, ConnectionRegistry};
use crate::domain::command::ConnectionState;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub send_welcome: bool,
}

impl WebSocketState {
    pub fn new(registry: Arc<ConnectionRegistry>, dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
            send_welcome: true,
        }
    }

    pub fn with_welcome(mut self, send_welcome: bool) -> Self {
        self.send_welcome = send_welcome;
        self
    }
}

/// Handle WebSocket upgrade requests for the notification stream.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs for the lifetime of one connection.
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (sender, mut receiver) = socket.split();

    let id = state.registry.register(WebSocketTransport::new(sender)).await;

    if state.send_welcome && !state.dispatcher.welcome(id).await {
        tracing::debug!(connection_id = %id, "Client disconnected before welcome");
        return;
    }

    let mut connection_state = ConnectionState::default();

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state
                    .dispatcher
                    .dispatch(id, &mut connection_state, &text)
                    .await;
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(connection_id = %id, "Ignoring binary frame");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Protocol-level; answered by axum
            }
            Ok(Message::Close(frame)) => {
                tracing::debug!(
                    connection_id = %id,
                    code = frame.as_ref().map(|f| f.code),
                    "Client sent close frame"
                );
                break;
            }
            Err(e) => {
                tracing::debug!(connection_id = %id, error = %e, "Receive error");
                break;
            }
        }

        // A failed push elsewhere may have evicted us.
        if !state.registry.is_open(id).await {
            break;
        }
    }

    state.registry.unregister(id).await;
}

/// Create axum router for the WebSocket endpoint at `path`.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router("/ws/medications").with_state(ws_state));
/// ```
pub fn websocket_router(path: &str) -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route(path, get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::NotificationBroadcaster;

    fn state() -> WebSocketState {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(NotificationBroadcaster::new(registry.clone()));
        let dispatcher = Arc::new(CommandDispatcher::new(registry.clone(), broadcaster));
        WebSocketState::new(registry, dispatcher)
    }

    #[test]
    fn welcome_is_enabled_by_default() {
        assert!(state().send_welcome);
        assert!(!state().with_welcome(false).send_welcome);
    }

    #[test]
    fn websocket_router_creates_route() {
        let _router: axum::Router = websocket_router("/ws/medications").with_state(state());
    }
}
