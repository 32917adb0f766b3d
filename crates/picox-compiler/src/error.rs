//! Error types for the command compiler.

use thiserror::Error;

/// Errors that can occur while compiling or rendering command templates.
#[derive(Debug, Error)]
pub enum CompileError {
    /// I/O error reading a template or writing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A string literal in the template is never closed.
    #[error("unterminated string starting at line {line}, column {column}")]
    UnterminatedString {
        /// Line of the opening quote (1-based).
        line: usize,
        /// Column of the opening quote (0-based).
        column: usize,
    },

    /// A named argument was not supplied when rendering.
    #[error("missing argument for parameter '{0}'")]
    MissingArgument(String),

    /// Wrong number of positional arguments when rendering.
    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount {
        /// Number of parameters of the command.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// A template file name is not usable as a command name.
    #[error("invalid command name: {0:?}")]
    InvalidName(String),

    /// No command with this name in the command set.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Failed to read or write a command set artifact.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;
