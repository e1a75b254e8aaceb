//! User initials and the prompt-until-valid loop.

use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Shortest accepted initials.
pub const MIN_INITIALS_LEN: usize = 2;

/// Longest accepted initials.
pub const MAX_INITIALS_LEN: usize = 3;

/// Question shown when asking for initials.
pub const INITIALS_PROMPT: &str = "Please enter your initials";

/// Initials errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitialsError {
    /// Wrong number of characters.
    #[error("Initials must be {MIN_INITIALS_LEN} or {MAX_INITIALS_LEN} characters, got {0}")]
    InvalidLength(usize),

    /// The input source closed before valid initials were entered.
    #[error("No initials entered")]
    Cancelled,
}

/// Uppercased initials of two or three characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Initials(String);

impl Initials {
    /// Validate and uppercase raw input.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input has two or three characters.
    pub fn parse(input: &str) -> Result<Self, InitialsError> {
        let upper = input.to_uppercase();
        let len = upper.chars().count();
        if (MIN_INITIALS_LEN..=MAX_INITIALS_LEN).contains(&len) {
            Ok(Self(upper))
        } else {
            Err(InitialsError::InvalidLength(len))
        }
    }

    /// Get the initials as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Initials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source of answers to modal questions.
pub trait Prompt {
    /// Ask a question. Returns `None` once the input is closed.
    fn ask(&mut self, message: &str) -> Option<String>;
}

/// Ask for initials until a valid answer is given.
///
/// # Errors
///
/// Returns [`InitialsError::Cancelled`] if the prompt closes first.
pub fn prompt_initials<P: Prompt + ?Sized>(prompt: &mut P) -> Result<Initials, InitialsError> {
    loop {
        let answer = prompt.ask(INITIALS_PROMPT).ok_or(InitialsError::Cancelled)?;
        match Initials::parse(&answer) {
            Ok(initials) => return Ok(initials),
            Err(e) => debug!(error = %e, "Rejected initials"),
        }
    }
}
