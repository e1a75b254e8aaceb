//! Line-based prompt for the initials question.

use circles_core::Prompt;
use std::io::{BufRead, Write};

/// Asks questions on `output` and reads one line of `input` per answer.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Create a prompt over a reader and a writer.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, message: &str) -> Option<String> {
        // A broken output does not stop the answer from being read.
        let _ = write!(self.output, "{message}: ");
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            // Only the terminator is dropped; spaces count towards the length.
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}
