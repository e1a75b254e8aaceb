//! # circles-core
//!
//! Core building blocks of the Circles demo:
//!
//! - **Relay** - single-topic fan-out of events to every connection
//! - **Message** - relay envelopes and connection identifiers
//! - **Canvas** - what a client renders for the events it receives
//! - **Palette** - random diameters and colours for new circles
//! - **Initials** - validation and the prompt-until-valid loop
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  Frame   ┌─────────┐  Arc<Envelope>  ┌────────────┐
//! │ Connection │─────────▶│  Relay  │────────────────▶│ every      │
//! └────────────┘          └─────────┘                 │ connection │
//!                                                     └─────┬──────┘
//!                                                           ▼
//!                                                     ┌────────────┐
//!                                                     │   Canvas   │
//!                                                     └────────────┘
//! ```

pub mod canvas;
pub mod initials;
pub mod message;
pub mod palette;
pub mod relay;

pub use canvas::{Canvas, CanvasChange, CircleElement};
pub use initials::{prompt_initials, Initials, InitialsError, Prompt};
pub use message::{ConnectionId, Envelope};
pub use palette::{compose_circle, Rgba};
pub use relay::{Relay, RelayConfig, RelayError, RelayStats};
