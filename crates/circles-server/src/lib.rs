//! # circles-server
//!
//! The Circles broadcast relay: a WebSocket endpoint that rebroadcasts every
//! `add-circle` and `clear-circles` event to all connected clients, plus the
//! browser page that draws them.

pub mod config;
pub mod handlers;
pub mod metrics;

pub use config::Config;
pub use handlers::{app, run_server, serve, AppState};
