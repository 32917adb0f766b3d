//! MicroPython REPL console protocol
//!
//! This crate provides the I/O-free half of talking to a microcontroller that
//! runs an interactive MicroPython REPL over a serial line. The REPL is a
//! console, not an RPC endpoint: it echoes input, prints prompts and mixes
//! program output with results. Request/response semantics are recovered by
//! framing each command with unique markers.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → device): Python source on one line, followed by the
//!   end-of-message trailer (`;pass;pass;pass;pass;print('<marker>')`) and
//!   `\r\n`. Block commands get one more `\r\n` so the indented suite closes.
//! - **Responses** (device → host): the echo of the command, the command's
//!   output, then the marker printed by the trailer and the `>>>` prompt.
//! - **Failures**: compiled commands catch remote exceptions and print the
//!   exception text followed by [`FAILURE_MARKER`].
//!
//! # Example
//!
//! ```rust
//! use picox_protocol::{clean_response, Command, EOM_TRAILER, EOR_TOKEN};
//!
//! let cmd = Command::new("x = 1 + 1; print(x)");
//! let frame = cmd.encode();
//! assert!(frame.ends_with(b"')\r\n"));
//!
//! // What the board sends back: echo, output, marker and prompt.
//! let raw = format!("x = 1 + 1; print(x){}\r\n2\r\n{}", EOM_TRAILER, EOR_TOKEN);
//! assert_eq!(clean_response(&raw).unwrap(), "2");
//! ```

mod error;
mod framer;
mod listing;
mod markers;
mod response;
mod transfer;

pub use error::*;
pub use framer::*;
pub use listing::*;
pub use markers::*;
pub use response::*;
pub use transfer::*;
