//! # circles-transport
//!
//! Client-side connections to a Circles relay.
//!
//! All transports implement the [`Connection`] trait, so client logic can be
//! written once and driven by a real socket or by an in-memory stand-in.
//!
//! ```rust,ignore
//! use circles_protocol::Encoding;
//! use circles_transport::{Connection, WebSocketConnection};
//!
//! let mut conn = WebSocketConnection::connect("ws://127.0.0.1:8080/ws", Encoding::Json).await?;
//! while let Some(event) = conn.recv().await? {
//!     println!("{}", event.name());
//! }
//! ```

pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use traits::{Connection, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::WebSocketConnection;
