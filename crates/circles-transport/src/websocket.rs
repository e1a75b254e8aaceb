//! WebSocket transport implementation.
//!
//! This module connects to a relay using tokio-tungstenite. JSON events
//! travel as text messages, MessagePack events as binary messages.

use async_trait::async_trait;
use bytes::BytesMut;
use circles_protocol::{codec, Encoding, Event, ProtocolError};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, warn};

use crate::traits::{Connection, TransportError};

/// Query parameter the relay reads the outbound encoding from.
pub const ENCODING_PARAM: &str = "encoding";

/// Build the endpoint URL that asks the relay for `encoding`.
#[must_use]
pub fn endpoint_url(base: &str, encoding: Encoding) -> String {
    if encoding == Encoding::default() {
        return base.to_string();
    }
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{ENCODING_PARAM}={encoding}")
}

/// A WebSocket connection to a relay.
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    encoding: Encoding,
    is_open: bool,
    read_buffer: BytesMut,
}

impl WebSocketConnection {
    /// Connect to the relay at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails.
    pub async fn connect(url: &str, encoding: Encoding) -> Result<Self, TransportError> {
        let endpoint = endpoint_url(url, encoding);
        let (stream, _response) = connect_async(endpoint.as_str()).await.map_err(|e| {
            error!(url = %endpoint, "WebSocket handshake failed: {}", e);
            TransportError::ConnectFailed(e.to_string())
        })?;

        debug!(url = %endpoint, encoding = %encoding, "Connected to relay");

        Ok(Self {
            stream,
            encoding,
            is_open: true,
            read_buffer: BytesMut::with_capacity(4096),
        })
    }

    /// Decode the next buffered binary event, skipping undecodable ones.
    fn next_buffered(&mut self) -> Result<Option<Event>, TransportError> {
        loop {
            match codec::decode_from(&mut self.read_buffer) {
                Ok(event) => return Ok(event),
                Err(ProtocolError::Decode(e)) => {
                    warn!("Skipping undecodable binary event: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn recv(&mut self) -> Result<Option<Event>, TransportError> {
        // Binary messages may carry several events.
        if let Some(event) = self.next_buffered()? {
            return Ok(Some(event));
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    self.read_buffer.extend_from_slice(&data);
                    if let Some(event) = self.next_buffered()? {
                        return Ok(Some(event));
                    }
                }
                Some(Ok(Message::Text(text))) => match codec::decode_text(&text) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => warn!("Skipping undecodable text event: {}", e),
                },
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        warn!("Failed to send pong: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    debug!("Received close frame");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(WsError::ConnectionClosed)) | None => {
                    debug!("WebSocket stream ended");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    self.is_open = false;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    async fn send(&mut self, event: &Event) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }

        let message = match self.encoding {
            Encoding::Json => Message::Text(codec::encode_text(event)?),
            Encoding::MessagePack => Message::Binary(codec::encode(event)?.to_vec()),
        };

        self.stream
            .send(message)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !std::mem::replace(&mut self.is_open, false) {
            return Ok(()); // Already closed
        }

        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to close: {}", e)))
    }

    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}
