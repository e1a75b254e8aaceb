//! Transport abstraction traits.

use async_trait::async_trait;
use circles_protocol::{Encoding, Event};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to establish the connection.
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] circles_protocol::ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open connection to a relay.
///
/// Connections carry events in both directions between one client and the
/// relay.
#[async_trait]
pub trait Connection: Send {
    /// Receive the next event from the relay.
    ///
    /// Returns `None` if the connection is closed cleanly.
    async fn recv(&mut self) -> Result<Option<Event>, TransportError>;

    /// Send an event to the relay.
    async fn send(&mut self, event: &Event) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Encoding used for outgoing events.
    fn encoding(&self) -> Encoding;

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
