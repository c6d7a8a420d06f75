//! ConnectionTransport port - Outbound half of one client connection.
//!
//! The registry keeps each transport behind its own mutex, so
//! implementations never see concurrent calls and may take `&mut self`.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),
}

#[async_trait]
pub trait ConnectionTransport: Send + 'static {
    /// Sends one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Sends a keep-alive probe.
    async fn send_ping(&mut self) -> Result<(), TransportError>;

    /// Closes the connection. Closing twice is harmless.
    async fn close(&mut self) -> Result<(), TransportError>;
}
