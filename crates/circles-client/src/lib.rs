//! # circles-client
//!
//! Terminal client for the Circles relay.
//!
//! A [`Session`] sends clicks and clears through any
//! [`Connection`](circles_transport::Connection) and renders whatever the
//! relay delivers back into a [`Canvas`](circles_core::Canvas).

pub mod command;
pub mod prompt;
pub mod session;

pub use command::{Command, CommandError};
pub use prompt::LinePrompt;
pub use session::Session;
