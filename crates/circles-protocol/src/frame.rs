//! Untyped events as the relay forwards them.
//!
//! A [`Frame`] only knows the event name. Its payload is whatever JSON the
//! sender put under `data`, so the relay can pass it on without reading it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::ProtocolError;
use crate::events::{Event, EventName};

/// An event with an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Which event this is.
    pub event: EventName,
    /// The payload, untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Frame {
    /// Create a frame without a payload.
    #[must_use]
    pub fn new(event: EventName) -> Self {
        Self { event, data: None }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Build the frame for a typed event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be represented as JSON.
    pub fn from_event(event: &Event) -> Result<Self, ProtocolError> {
        let frame = match event {
            Event::AddCircle(circle) => {
                Self::new(EventName::AddCircle).with_data(serde_json::to_value(circle)?)
            }
            Event::ClearCircles => Self::new(EventName::ClearCircles),
        };
        Ok(frame)
    }

    /// Read the payload as a typed event.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not have the event's shape.
    pub fn to_event(&self) -> Result<Event, ProtocolError> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }
}

impl TryFrom<&Event> for Frame {
    type Error = ProtocolError;

    fn try_from(event: &Event) -> Result<Self, Self::Error> {
        Frame::from_event(event)
    }
}
