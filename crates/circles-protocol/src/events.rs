//! Event types for the Circles protocol.
//!
//! The same two events are sent client → relay and relay → clients.
//! On the wire an event is tagged by its name and carries its payload
//! under `data`.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

/// Event name identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "add-circle")]
    AddCircle,
    #[serde(rename = "clear-circles")]
    ClearCircles,
}

impl EventName {
    /// The name used on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::AddCircle => "add-circle",
            EventName::ClearCircles => "clear-circles",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One circle to render.
///
/// Values are kept exactly as the originating client produced them;
/// nothing here checks ranges. Positions are JSON numbers because browsers
/// report fractional pixels on zoomed pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleEvent {
    /// Initials of the user who clicked.
    pub initials: String,
    /// Horizontal click position in pixels.
    pub x: Number,
    /// Vertical click position in pixels.
    pub y: Number,
    /// Diameter in pixels.
    #[serde(rename = "dia")]
    pub diameter: Number,
    /// CSS colour, `rgba(r,g,b,a)`.
    #[serde(rename = "rgba")]
    pub color: String,
}

impl CircleEvent {
    /// Click position as floating point pixels.
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (pixels(&self.x), pixels(&self.y))
    }

    /// Diameter as floating point pixels.
    #[must_use]
    pub fn diameter_px(&self) -> f64 {
        pixels(&self.diameter)
    }
}

fn pixels(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

/// A protocol event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    /// Draw a circle.
    #[serde(rename = "add-circle")]
    AddCircle(CircleEvent),

    /// Empty the canvas.
    #[serde(rename = "clear-circles")]
    ClearCircles,
}

impl Event {
    /// Get the event name.
    #[must_use]
    pub fn name(&self) -> EventName {
        match self {
            Event::AddCircle(_) => EventName::AddCircle,
            Event::ClearCircles => EventName::ClearCircles,
        }
    }

    /// Create a new add-circle event.
    #[must_use]
    pub fn add_circle(circle: CircleEvent) -> Self {
        Event::AddCircle(circle)
    }

    /// Create a new clear-circles event.
    #[must_use]
    pub fn clear() -> Self {
        Event::ClearCircles
    }

    /// The circle carried by this event, if any.
    #[must_use]
    pub fn circle(&self) -> Option<&CircleEvent> {
        match self {
            Event::AddCircle(circle) => Some(circle),
            Event::ClearCircles => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CircleEvent {
        CircleEvent {
            initials: "AB".to_string(),
            x: 50.into(),
            y: 80.into(),
            diameter: 42.into(),
            color: "rgba(1,2,3,0.5)".to_string(),
        }
    }

    #[test]
    fn test_event_name() {
        assert_eq!(Event::add_circle(sample()).name(), EventName::AddCircle);
        assert_eq!(Event::clear().name(), EventName::ClearCircles);
        assert_eq!(EventName::AddCircle.to_string(), "add-circle");
        assert_eq!(EventName::ClearCircles.as_str(), "clear-circles");
        assert_eq!(
            serde_json::to_value(EventName::ClearCircles).unwrap(),
            json!("clear-circles")
        );
    }

    #[test]
    fn test_add_circle_wire_shape() {
        let value = serde_json::to_value(Event::add_circle(sample())).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "add-circle",
                "data": {
                    "initials": "AB",
                    "x": 50,
                    "y": 80,
                    "dia": 42,
                    "rgba": "rgba(1,2,3,0.5)"
                }
            })
        );
    }

    #[test]
    fn test_clear_wire_shape() {
        let value = serde_json::to_value(Event::clear()).unwrap();
        assert_eq!(value, json!({ "event": "clear-circles" }));
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        let raw = json!({
            "event": "add-circle",
            "data": { "initials": "", "x": -5, "y": 0, "dia": -20, "rgba": "nonsense" }
        });
        let event: Event = serde_json::from_value(raw).unwrap();
        let circle = event.circle().unwrap();
        assert_eq!(circle.diameter, Number::from(-20));
        assert_eq!(circle.diameter_px(), -20.0);
        assert_eq!(circle.color, "nonsense");
    }

    #[test]
    fn test_fractional_positions_are_kept() {
        let raw = json!({
            "event": "add-circle",
            "data": { "initials": "AB", "x": 50.5, "y": 80.25, "dia": 42, "rgba": "red" }
        });
        let event: Event = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(event.circle().unwrap().position(), (50.5, 80.25));
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }
}
