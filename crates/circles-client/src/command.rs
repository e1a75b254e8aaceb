//! Commands typed at the terminal.

use std::str::FromStr;
use thiserror::Error;

/// Help text listing every command.
pub const HELP: &str = "commands: click X Y | clear | list | help | quit";

/// Command parse errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line.
    #[error("Empty command")]
    Empty,

    /// Unrecognised command word.
    #[error("Unknown command: {0}")]
    Unknown(String),

    /// Wrong arguments for `click`.
    #[error("Usage: click X Y")]
    Usage,

    /// A coordinate that is not an integer.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// A terminal command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Click the canvas at a position.
    Click { x: i32, y: i32 },
    /// Clear every canvas.
    Clear,
    /// Print the local canvas.
    List,
    /// Print the command list.
    Help,
    /// Leave.
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(CommandError::Empty);
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "click" | "c" => {
                let (Some(x), Some(y), None) = (words.next(), words.next(), words.next()) else {
                    return Err(CommandError::Usage);
                };
                return Ok(Self::Click {
                    x: coordinate(x)?,
                    y: coordinate(y)?,
                });
            }
            "clear" => Self::Clear,
            "list" | "ls" => Self::List,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        match words.next() {
            Some(_) => Err(CommandError::Unknown(line.trim().to_string())),
            None => Ok(command),
        }
    }
}

fn coordinate(word: &str) -> Result<i32, CommandError> {
    word.parse()
        .map_err(|_| CommandError::InvalidCoordinate(word.to_string()))
}
