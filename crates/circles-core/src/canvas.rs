//! Client-side canvas model.
//!
//! A [`Canvas`] is what a client shows after applying the events the relay
//! delivered to it. The browser page draws the same geometry into the DOM;
//! native clients keep it here.

use circles_protocol::{CircleEvent, Event};
use std::fmt::Write as _;

/// Text colour used for the initials inside a circle.
pub const LABEL_COLOR: &str = "white";

/// A rendered circle.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleElement {
    /// Left edge in pixels.
    pub left: f64,
    /// Top edge in pixels.
    pub top: f64,
    /// Width and height in pixels.
    pub size: f64,
    /// Font size of the label in pixels.
    pub font_size: f64,
    /// Fill colour.
    pub background: String,
    /// The initials drawn in the middle.
    pub label: String,
}

impl CircleElement {
    /// Lay out the element for a received circle.
    ///
    /// The box is offset by half the diameter, rounded half up, so that its
    /// centre lands on the click position.
    #[must_use]
    pub fn from_event(circle: &CircleEvent) -> Self {
        let (x, y) = circle.position();
        let diameter = circle.diameter_px();
        let half = (diameter / 2.0 + 0.5).floor();
        Self {
            left: x - half,
            top: y - half,
            size: diameter,
            font_size: (diameter / 3.0).floor(),
            background: circle.color.clone(),
            label: circle.initials.clone(),
        }
    }

    /// Centre of the element, in pixels.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        let radius = self.size / 2.0;
        (self.left + radius, self.top + radius)
    }

    /// Inline CSS for the element.
    #[must_use]
    pub fn style(&self) -> String {
        let mut css = String::new();
        let _ = write!(
            css,
            "left: {}px; top: {}px; width: {size}px; height: {size}px; \
             background-color: {}; font-size: {}px; color: {LABEL_COLOR}; \
             text-align: center; line-height: {size}px;",
            self.left,
            self.top,
            self.background,
            self.font_size,
            size = self.size,
        );
        css
    }
}

/// What applying an event did to the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasChange {
    /// A circle was drawn.
    Added(CircleElement),
    /// The canvas was emptied; holds how many circles were removed.
    Cleared(usize),
}

/// The set of circles a client currently shows.
#[derive(Debug, Default, Clone)]
pub struct Canvas {
    elements: Vec<CircleElement>,
}

impl Canvas {
    /// Create an empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one received event.
    pub fn apply(&mut self, event: &Event) -> CanvasChange {
        match event {
            Event::AddCircle(circle) => CanvasChange::Added(self.add_circle(circle).clone()),
            Event::ClearCircles => CanvasChange::Cleared(self.clear()),
        }
    }

    /// Draw a circle and return the new element.
    pub fn add_circle(&mut self, circle: &CircleEvent) -> &CircleElement {
        self.elements.push(CircleElement::from_event(circle));
        &self.elements[self.elements.len() - 1]
    }

    /// Remove every circle. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.elements.len();
        self.elements.clear();
        removed
    }

    /// Elements in drawing order.
    #[must_use]
    pub fn elements(&self) -> &[CircleElement] {
        &self.elements
    }

    /// Number of circles shown.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the canvas is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
