//! Error types for the session layer.

use std::io;

use picox_compiler::CompileError;
use picox_protocol::{ProtocolError, RemoteError, ResponseError};
use thiserror::Error;

/// Errors of the local byte channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The expected token did not arrive before the read timeout.
    #[error("timed out waiting for {token:?} (received {received:?})")]
    Timeout {
        /// Token that was awaited.
        token: String,
        /// Everything received before giving up.
        received: String,
    },

    /// I/O error on the channel.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The channel is not open.
    #[error("port {port} is not open")]
    NotOpen {
        /// Port name.
        port: String,
    },
}

/// Errors returned by [`Session`](crate::Session) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Local channel failure. The session stays usable.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The remote interpreter raised an exception.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The response could not be interpreted. Reset before continuing.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Upload target exists and overwriting was not requested.
    #[error("remote path already exists: {0}")]
    AlreadyExists(String),

    /// Remote path does not exist.
    #[error("remote path not found: {0}")]
    NotFound(String),

    /// Remote path cannot be embedded in a command.
    #[error("invalid remote path: {0:?}")]
    InvalidPath(String),

    /// The board did not answer the health check correctly.
    #[error("health check failed on {port}")]
    HealthCheckFailed {
        /// Port name.
        port: String,
    },

    /// Interrupted by the user.
    #[error("interrupted")]
    Interrupted,

    /// A built-in command could not be rendered.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Reading or writing a local file failed.
    #[error("local I/O error: {0}")]
    LocalIo(#[from] io::Error),
}

impl From<ResponseError> for SessionError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Remote(e) => SessionError::Remote(e),
            ResponseError::Protocol(e) => SessionError::Protocol(e),
        }
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
