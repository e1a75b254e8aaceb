//! Relay envelopes and connection identifiers.

use circles_protocol::Frame;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a connection ID from an existing value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh connection ID, unique within this process.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "conn_{}",
            NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed)
        ))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A frame as routed through the relay.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Connection the frame arrived on.
    pub source: Option<ConnectionId>,
    /// The frame, exactly as received.
    pub frame: Frame,
}

impl Envelope {
    /// Wrap a frame.
    #[must_use]
    pub fn new(frame: Frame) -> Self {
        Self {
            source: None,
            frame,
        }
    }

    /// Record the connection the frame came from.
    #[must_use]
    pub fn with_source(mut self, source: ConnectionId) -> Self {
        self.source = Some(source);
        self
    }
}
