//! Wire markers shared with compiled remote command templates.
//!
//! These strings are part of the contract with templates that were compiled
//! ahead of time. They must stay byte-identical.

macro_rules! eor_marker {
    () => {
        "---f81b734f-7be3-4747-ae0b-c449006b33dd---"
    };
}

/// Line terminator sent after every command.
pub const TERMINATOR: &str = "\r\n";

/// Primary REPL prompt, including the line break that precedes it.
pub const PRIMARY_PROMPT: &str = "\r\n>>>";

/// Block continuation prompt.
pub const BLOCK_PROMPT: &str = "...";

/// Unique token printed by the device once a command has finished.
pub const EOR_MARKER: &str = eor_marker!();

/// End-of-response token: the marker followed by the primary prompt.
pub const EOR_TOKEN: &str = concat!(eor_marker!(), "\r\n>>>");

/// Trailer appended to every outgoing command. It prints [`EOR_MARKER`].
pub const EOM_TRAILER: &str = concat!(";pass;pass;pass;pass;print('", eor_marker!(), "')");

/// Sentinel printed after the exception text when a compiled command fails.
pub const FAILURE_MARKER: &str = "FAILED---0dfe99a5-4543-4fc0-8986-5d7fd5e51d7b---ERROR";

/// Number of [`FAILURE_MARKER`] occurrences that end a read early.
///
/// Assumes the board echoes input: the echoed command carries the marker
/// once and the failure print carries it again. A firmware without echo
/// would need a threshold of 1.
pub const FAILURE_MARKER_THRESHOLD: usize = 2;

/// Ctrl+C: interrupt whatever is executing.
pub const INTERRUPT: u8 = 0x03;

/// Ctrl+D: soft reboot when the REPL is idle.
pub const SOFT_REBOOT: u8 = 0x04;

/// Backspace, sometimes prepended to REPL output.
pub const BACKSPACE: char = '\x08';

/// Value typed at the interactive prompt to leave passthrough mode.
pub const EXIT_SENTINEL: &str = "exit()";

/// Header printed by an unwrapped command that raised in the REPL.
pub const TRACEBACK_HEADER: &str = "Traceback (most recent call last):";
