//! Error types for the REPL protocol.

use thiserror::Error;

/// Errors caused by output the host could not make sense of.
///
/// These indicate a desynchronised console or unsupported firmware. They are
/// not retried; the session has to be reset to idle before continuing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The response did not contain the expected markers.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The payload was found but is not in the expected shape.
    #[error("unexpected format: {0}")]
    UnexpectedFormat(String),

    /// A block continuation prompt was too short to strip.
    #[error("unable to parse block prompt in response: {0:?}")]
    BlockPrompt(String),
}

/// An exception raised by the remote interpreter while running a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("remote exception: {exception}")]
pub struct RemoteError {
    /// Exception text exactly as the device reported it.
    pub exception: String,
}

impl RemoteError {
    /// Create a remote error from the reported exception text.
    pub fn new(exception: impl Into<String>) -> Self {
        RemoteError {
            exception: exception.into(),
        }
    }

    /// Whether the board reported a path that does not exist, either
    /// directly or because a parent component is missing or not a directory.
    pub fn is_missing_path(&self) -> bool {
        self.exception.contains("ENOENT") || self.exception.contains("ENOTDIR")
    }
}

/// Failure while turning a raw response into a payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// The command raised on the device.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The response could not be parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
