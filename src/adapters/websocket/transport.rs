//! ConnectionTransport over the send half of an axum WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;

use crate::ports::{ConnectionTransport, TransportError};

pub struct WebSocketTransport {
    sender: SplitSink<WebSocket, Message>,
}

impl WebSocketTransport {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender }
    }
}

fn send_error(e: axum::Error) -> TransportError {
    TransportError::Send(e.to_string())
}

#[async_trait]
impl ConnectionTransport for WebSocketTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sender.send(Message::Text(text)).await.map_err(send_error)
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.sender.send(Message::Ping(Vec::new())).await.map_err(send_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // The peer may already be gone; a failed close frame is not an error.
        let _ = self.sender.send(Message::Close(None)).await;
        self.sender.close().await.map_err(send_error)
    }
}
