//! Interactive passthrough and console attach.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use picox_protocol::{BACKSPACE, BLOCK_PROMPT, EXIT_SENTINEL, PRIMARY_PROMPT, TERMINATOR};
use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::session::Session;

/// Shared flag telling a running loop to stop, set from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Turn the board's reply to a typed line into the text shown before the
/// next prompt: stray leading backspaces and the echo of the line go.
pub fn clean_repl_output(output: &str, line: &str) -> String {
    let output = output.trim_start_matches(BACKSPACE);
    let echo = line.trim();
    let output = if echo.is_empty() {
        output.to_string()
    } else {
        output.replacen(echo, "", 1)
    };
    output.trim().to_string()
}

/// Read lines from `input` on a background thread, so waiting for the next
/// line never blocks the caller. The channel closes at end of input.
fn spawn_line_reader<I: BufRead + Send + 'static>(mut input: I) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || loop {
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    });
    rx
}

/// Wait for the next input line, checking `cancel` every `poll`.
///
/// Returns `None` at end of input.
fn next_line(
    lines: &Receiver<io::Result<String>>,
    cancel: &CancelFlag,
    poll: Duration,
) -> Result<Option<String>> {
    loop {
        if cancel.is_cancelled() {
            return Err(SessionError::Interrupted);
        }
        match lines.recv_timeout(poll) {
            Ok(line) => return Ok(Some(line?)),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(None),
        }
    }
}

impl Session {
    /// Forward lines from `input` to the board's REPL and show its replies.
    ///
    /// Resets the board first. Returns when the user types `exit()` or input
    /// ends; returns `Interrupted` once `cancel` is set.
    pub fn repl<I: BufRead + Send + 'static, O: Write>(
        &mut self,
        input: I,
        mut output: O,
        cancel: &CancelFlag,
    ) -> Result<()> {
        self.reset_to_idle()?;
        // The reset discarded the last prompt, ask for a fresh one.
        self.transport.write(TERMINATOR.as_bytes())?;
        let raw = self.transport.read_until(PRIMARY_PROMPT)?;
        let mut prompt = String::from_utf8_lossy(&raw).trim().to_string();
        info!(parent: self.transport.span(), "entering REPL on {}", self.port());

        let lines = spawn_line_reader(input);
        loop {
            if cancel.is_cancelled() {
                return Err(SessionError::Interrupted);
            }
            write!(output, "{} ", prompt)?;
            output.flush()?;

            let Some(line) = next_line(&lines, cancel, self.config.poll_interval)? else {
                writeln!(output)?;
                return Ok(());
            };
            let line = line.trim_end_matches(['\r', '\n']);
            if line == EXIT_SENTINEL {
                debug!(parent: self.transport.span(), "leaving REPL");
                return Ok(());
            }

            self.transport.write(format!("{}\r", line).as_bytes())?;
            let reply = self.transport.read_until_any(
                &[PRIMARY_PROMPT, BLOCK_PROMPT],
                self.config.settle_interval,
                cancel,
            )?;
            if cancel.is_cancelled() {
                return Err(SessionError::Interrupted);
            }
            prompt = clean_repl_output(&String::from_utf8_lossy(&reply), line);
        }
    }

    /// Print everything the board sends until `cancel` is set.
    ///
    /// Sends nothing and never resets, so a running script is left alone.
    pub fn attach<O: Write>(&mut self, mut output: O, cancel: &CancelFlag) -> Result<()> {
        self.ensure_open()?;
        info!(parent: self.transport.span(), "attached to console of {}", self.port());
        while !cancel.is_cancelled() {
            let data = self.transport.poll_available()?;
            if data.is_empty() {
                thread::sleep(self.config.poll_interval);
                continue;
            }
            output.write_all(&data)?;
            output.flush()?;
        }
        Ok(())
    }
}
