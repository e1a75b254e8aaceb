//! Codecs for encoding and decoding Circles events.
//!
//! Two encodings are supported:
//!
//! - JSON, carried in WebSocket text frames (what browsers speak)
//! - MessagePack with a 4-byte length prefix, carried in binary frames
//!
//! Clients work with typed [`Event`]s. The relay works with [`Frame`]s so
//! that payloads pass through it unchanged.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::events::Event;
use crate::frame::Frame;

/// Maximum frame size (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Length prefix size in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// Not enough data to decode frame.
    #[error("Incomplete frame: need {0} more bytes")]
    Incomplete(usize),

    /// MessagePack encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding error.
    #[error("Decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input.
    #[error("Invalid frame: {0}")]
    Invalid(String),
}

/// Wire encoding of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Encoding {
    /// JSON text frames.
    #[default]
    #[serde(rename = "json")]
    Json,
    /// Length-prefixed MessagePack binary frames.
    #[serde(rename = "msgpack")]
    MessagePack,
}

impl Encoding {
    /// The name used in query strings and on the command line.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::MessagePack => "msgpack",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Encoding::Json),
            "msgpack" | "messagepack" => Ok(Encoding::MessagePack),
            other => Err(ProtocolError::Invalid(format!("unknown encoding '{other}'"))),
        }
    }
}

// Query strings and config files accept the same names as the command line.
impl<'de> Deserialize<'de> for Encoding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Encode an event as a JSON text frame.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_text(event: &Event) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}

/// Decode an event from a JSON text frame.
///
/// # Errors
///
/// Returns an error if the text is not a known event.
pub fn decode_text(text: &str) -> Result<Event, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode an event to a binary frame.
///
/// The encoded format is:
/// - 4 bytes: Big-endian length prefix
/// - N bytes: MessagePack-encoded event
///
/// # Errors
///
/// Returns an error if the frame is too large or encoding fails.
pub fn encode(event: &Event) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::new();
    encode_into(event, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode an event into an existing buffer.
///
/// # Errors
///
/// Returns an error if the frame is too large or encoding fails.
pub fn encode_into(event: &Event, buf: &mut BytesMut) -> Result<(), ProtocolError> {
    write_prefixed(event, buf)
}

/// Decode an event from a binary frame.
///
/// # Errors
///
/// Returns an error if the data is incomplete, too large, or invalid.
pub fn decode(data: &[u8]) -> Result<Event, ProtocolError> {
    read_prefixed(data)
}

/// Try to decode an event from a buffer, advancing it if successful.
///
/// Returns `Ok(Some(event))` if a complete frame was decoded,
/// `Ok(None)` if more data is needed, or `Err` on protocol error.
///
/// # Errors
///
/// Returns an error if the frame is too large or invalid. An invalid
/// frame is still consumed so the next one can be read.
pub fn decode_from(buf: &mut BytesMut) -> Result<Option<Event>, ProtocolError> {
    take_prefixed(buf)
}

/// Encode a relay frame as JSON text.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_frame_text(frame: &Frame) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(frame)?)
}

/// Decode a relay frame from JSON text.
///
/// Only the event name is checked; the payload is kept as sent.
///
/// # Errors
///
/// Returns an error if the text is not JSON or names an unknown event.
pub fn decode_frame_text(text: &str) -> Result<Frame, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode a relay frame as a length-prefixed MessagePack frame.
///
/// # Errors
///
/// Returns an error if the frame is too large or encoding fails.
pub fn encode_frame(frame: &Frame) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::new();
    write_prefixed(frame, &mut buf)?;
    Ok(buf.freeze())
}

/// Try to decode a relay frame from a buffer, advancing it if successful.
///
/// # Errors
///
/// Same as [`decode_from`].
pub fn decode_frame_from(buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
    take_prefixed(buf)
}

fn write_prefixed<T: Serialize + ?Sized>(value: &T, buf: &mut BytesMut) -> Result<(), ProtocolError> {
    let payload = rmp_serde::to_vec_named(value)?;

    if payload.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }

    buf.reserve(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.extend_from_slice(&payload);

    Ok(())
}

fn read_prefixed<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.len() < LENGTH_PREFIX_SIZE {
        return Err(ProtocolError::Incomplete(LENGTH_PREFIX_SIZE - data.len()));
    }

    let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;

    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(length));
    }

    let total_size = LENGTH_PREFIX_SIZE + length;
    if data.len() < total_size {
        return Err(ProtocolError::Incomplete(total_size - data.len()));
    }

    Ok(rmp_serde::from_slice(&data[LENGTH_PREFIX_SIZE..total_size])?)
}

fn take_prefixed<T: DeserializeOwned>(buf: &mut BytesMut) -> Result<Option<T>, ProtocolError> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let length = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(length));
    }

    let total_size = LENGTH_PREFIX_SIZE + length;
    if buf.len() < total_size {
        return Ok(None);
    }

    buf.advance(LENGTH_PREFIX_SIZE);
    let payload = buf.split_to(length);

    Ok(Some(rmp_serde::from_slice(&payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CircleEvent;

    fn circle() -> Event {
        Event::add_circle(CircleEvent {
            initials: "XYZ".to_string(),
            x: 640.into(),
            y: 12.into(),
            diameter: 100.into(),
            color: "rgba(255,0,128,1)".to_string(),
        })
    }

    #[test]
    fn test_binary_roundtrip() {
        for event in [circle(), Event::clear()] {
            let encoded = encode(&event).unwrap();
            assert_eq!(decode(&encoded).unwrap(), event);
        }
    }

    #[test]
    fn test_text_accepts_browser_frames() {
        let text = r#"{"event":"add-circle","data":{"initials":"AB","x":50,"y":80,"dia":33,"rgba":"rgba(9,9,9,0.2)"}}"#;
        let event = decode_text(text).unwrap();
        let circle = event.circle().unwrap();
        assert_eq!(circle.position(), (50.0, 80.0));
        assert_eq!(circle.diameter_px(), 33.0);

        let clear = decode_text(r#"{"event":"clear-circles"}"#).unwrap();
        assert_eq!(clear, Event::clear());
    }

    #[test]
    fn test_text_rejects_unknown_event() {
        assert!(matches!(
            decode_text(r#"{"event":"paint-square"}"#),
            Err(ProtocolError::Json(_))
        ));
        assert!(decode_text("not json").is_err());
    }

    #[test]
    fn test_decode_incomplete() {
        let encoded = encode(&circle()).unwrap();

        let partial = &encoded[..5];
        match decode(partial) {
            Err(ProtocolError::Incomplete(_)) => {}
            other => panic!("Expected Incomplete error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_frame_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u32((MAX_FRAME_SIZE + 1) as u32);
        buf.extend_from_slice(&[0u8; 8]);

        match decode_from(&mut buf) {
            Err(ProtocolError::FrameTooLarge(_)) => {}
            other => panic!("Expected FrameTooLarge error, got {:?}", other),
        }
    }

    #[test]
    fn test_streaming_decode() {
        let mut buf = BytesMut::new();
        encode_into(&circle(), &mut buf).unwrap();
        encode_into(&Event::clear(), &mut buf).unwrap();

        // Hold back the last byte: the second frame must wait for it.
        let last = buf.split_off(buf.len() - 1);

        assert_eq!(decode_from(&mut buf).unwrap(), Some(circle()));
        assert_eq!(decode_from(&mut buf).unwrap(), None);

        buf.unsplit(last);
        assert_eq!(decode_from(&mut buf).unwrap(), Some(Event::clear()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!("json".parse::<Encoding>().unwrap(), Encoding::Json);
        assert_eq!("MsgPack".parse::<Encoding>().unwrap(), Encoding::MessagePack);
        assert!("xml".parse::<Encoding>().is_err());
        assert_eq!(Encoding::default(), Encoding::Json);
    }

    #[test]
    fn test_encoding_deserialize_matches_parse() {
        for name in ["json", "JSON", "msgpack", "MessagePack", "messagepack"] {
            let quoted = format!("\"{name}\"");
            let parsed: Encoding = serde_json::from_str(&quoted).unwrap();
            assert_eq!(parsed, name.parse::<Encoding>().unwrap());
        }
        assert!(serde_json::from_str::<Encoding>("\"xml\"").is_err());
        assert_eq!(serde_json::to_string(&Encoding::MessagePack).unwrap(), "\"msgpack\"");
    }

    #[test]
    fn test_frame_binary_keeps_payload() {
        let text = r#"{"event":"add-circle","data":{"initials":"AB","x":50.5,"y":80,"extra":[1,2]}}"#;
        let frame = decode_frame_text(text).unwrap();

        let mut buf = BytesMut::from(&encode_frame(&frame).unwrap()[..]);
        let decoded = decode_frame_from(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(encode_frame_text(&decoded).unwrap(), text);
    }

    #[test]
    fn test_typed_event_reads_relayed_frame() {
        let frame = Frame::from_event(&circle()).unwrap();

        let mut buf = BytesMut::from(&encode_frame(&frame).unwrap()[..]);
        assert_eq!(decode_from(&mut buf).unwrap(), Some(circle()));
        assert_eq!(decode_text(&encode_frame_text(&frame).unwrap()).unwrap(), circle());
    }
}
