//! # circles-protocol
//!
//! Wire definitions for the Circles broadcast relay.
//!
//! Two events travel in both directions between clients and the relay:
//!
//! - `add-circle` - draw one circle on every canvas
//! - `clear-circles` - empty every canvas
//!
//! Browsers exchange them as JSON text frames, native clients may use
//! length-prefixed MessagePack binary frames instead. The relay forwards
//! [`Frame`]s, whose payload it never interprets.
//!
//! ## Example
//!
//! ```rust
//! use circles_protocol::{codec, CircleEvent, Event};
//!
//! let event = Event::add_circle(CircleEvent {
//!     initials: "AB".to_string(),
//!     x: 50.into(),
//!     y: 80.into(),
//!     diameter: 42.into(),
//!     color: "rgba(12,200,7,0.5)".to_string(),
//! });
//!
//! let text = codec::encode_text(&event).unwrap();
//! assert_eq!(codec::decode_text(&text).unwrap(), event);
//! ```

pub mod codec;
pub mod events;
pub mod frame;

pub use codec::{decode, decode_text, encode, encode_text, Encoding, ProtocolError};
pub use events::{CircleEvent, Event, EventName};
pub use frame::Frame;
