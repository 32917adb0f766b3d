//! Command framing.
//!
//! Every command is sent as a single line with [`EOM_TRAILER`] appended. The
//! trailer runs after the command and prints the end-of-response marker,
//! which is what lets the host find where the command's output stops.

use crate::markers::{EOM_TRAILER, TERMINATOR};

/// A command to run on the remote interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Python source, on one line.
    text: String,
    /// Compound statement that needs a blank line to close its suite.
    is_block: bool,
    /// Fire-and-forget: do not wait for the end-of-response marker.
    ignore_response: bool,
}

impl Command {
    /// Create a single-statement command.
    pub fn new(text: impl Into<String>) -> Self {
        Command {
            text: text.into(),
            is_block: false,
            ignore_response: false,
        }
    }

    /// Create a block command (`with`, `for`, `try`, ...).
    pub fn block(text: impl Into<String>) -> Self {
        Command::new(text).with_block(true)
    }

    /// Set whether the command opens an indented block.
    pub fn with_block(mut self, is_block: bool) -> Self {
        self.is_block = is_block;
        self
    }

    /// Do not wait for a response, e.g. when starting a long-running script.
    pub fn ignoring_response(mut self) -> Self {
        self.ignore_response = true;
        self
    }

    /// Get the command text as typed, without framing.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Check if this is a block command.
    pub fn is_block(&self) -> bool {
        self.is_block
    }

    /// Check if the response should be ignored.
    pub fn ignores_response(&self) -> bool {
        self.ignore_response
    }

    /// Encode the command for transmission.
    ///
    /// Appends the trailer and terminator. Block commands get an extra blank
    /// line so the REPL leaves continuation mode and executes the suite,
    /// trailer included.
    pub fn encode(&self) -> Vec<u8> {
        frame(&self.text, self.is_block).into_bytes()
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Command::new(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Command::new(text)
    }
}

/// Frame raw command text with the end-of-message trailer.
pub fn frame(text: &str, is_block: bool) -> String {
    let mut framed = String::with_capacity(text.len() + EOM_TRAILER.len() + 2 * TERMINATOR.len());
    framed.push_str(text);
    framed.push_str(EOM_TRAILER);
    framed.push_str(TERMINATOR);
    if is_block {
        framed.push_str(TERMINATOR);
    }
    framed
}
