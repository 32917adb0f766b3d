//! Offline compiler for MicroPython command templates.
//!
//! A template is an ordinary MicroPython script with `{name}` placeholders.
//! Compiling it produces a single line of the form `exec('...')` that can be
//! sent over the REPL in one write: comments are stripped, f-string braces
//! escaped, the body folded onto one line, quotes escaped and the whole
//! thing wrapped in a `try`/`except` that prints the failure marker.
//!
//! ```
//! use picox_compiler::compile;
//!
//! let cmd = compile("import os\nos.mkdir(\"{directory}\")\n").unwrap();
//! assert_eq!(cmd.parameters, vec!["directory"]);
//! let line = cmd.render(&["/data"]).unwrap();
//! assert!(line.starts_with("exec('try:\\n    import os\\n    os.mkdir(\\\"/data\\\")"));
//! ```

mod artifact;
mod codegen;
mod error;
pub mod lexer;
pub mod passes;
mod template;

pub use artifact::*;
pub use codegen::*;
pub use error::*;
pub use template::*;
