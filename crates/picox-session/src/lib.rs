//! MicroPython board sessions over a serial console
//!
//! This crate drives a board running the MicroPython REPL as if it offered
//! request/response calls. A [`Session`] owns a [`Transport`] over a
//! [`Link`] (normally a serial port), forces the interpreter into a known
//! idle state, frames each command with the markers from
//! [`picox_protocol`] and turns the echoed console output back into the
//! command's result.
//!
//! On top of [`Session::run`] it provides file operations (listing,
//! download, hex-encoded upload, mkdir, delete), script execution, an
//! interactive passthrough REPL and a read-only console attach mode.
//!
//! # Example
//!
//! ```no_run
//! use picox_session::{Session, SessionConfig};
//!
//! let mut session = Session::open(SessionConfig::new("/dev/ttyACM0"))?;
//! println!("{:?}", session.list_dir(None)?);
//! let out = session.run_python("print(sum(range(10)))", false)?;
//! assert_eq!(out, "45");
//! # Ok::<(), picox_session::SessionError>(())
//! ```

pub mod commands;
mod config;
mod error;
mod files;
mod link;
mod repl;
mod session;
mod transport;

pub use config::*;
pub use error::*;
pub use link::*;
pub use repl::*;
pub use session::*;
pub use transport::*;
