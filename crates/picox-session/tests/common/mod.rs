//! In-memory MicroPython board for integration tests.
//!
//! `FakeBoard` answers framed commands the way the REPL does (echo, output,
//! end-of-response marker, prompt) and keeps a tiny filesystem so the file
//! operations can be exercised end to end. Every write is recorded.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use picox_protocol::{
    decode_upload, EOM_TRAILER, EOR_MARKER, FAILURE_MARKER, INTERRUPT, SOFT_REBOOT,
};
use picox_session::{Link, SessionConfig};

pub const TRACEBACK_DIVISION: &str = "Traceback (most recent call last):\r\n  File \"<stdin>\", line 1, in <module>\r\nZeroDivisionError: division by zero\r\n";

/// Configuration suited to the fake board: no settling, short timeouts.
pub fn fast_config() -> SessionConfig {
    SessionConfig::new("fake")
        .with_settle_interval(Duration::ZERO)
        .with_poll_interval(Duration::from_millis(1))
        .with_read_timeout(Duration::from_millis(200))
}

#[derive(Debug)]
pub struct BoardState {
    pub pending: VecDeque<u8>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeSet<String>,
    pub writes: Vec<Vec<u8>>,
    pub interrupts: usize,
    pub reboots: usize,
    pub health_reply: String,
    pub echo_backspaces: bool,
    pub silent: bool,
}

impl Default for BoardState {
    fn default() -> Self {
        BoardState {
            pending: VecDeque::new(),
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
            writes: Vec::new(),
            interrupts: 0,
            reboots: 0,
            health_reply: "2\r\n".to_string(),
            echo_backspaces: false,
            silent: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeBoard(Arc<Mutex<BoardState>>);

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, contents: &[u8]) -> Self {
        self.state().files.insert(path.to_string(), contents.to_vec());
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state().dirs.insert(path.to_string());
        self
    }

    pub fn link(&self) -> Box<dyn Link> {
        Box::new(self.clone())
    }

    pub fn state(&self) -> MutexGuard<'_, BoardState> {
        self.0.lock().unwrap()
    }

    pub fn write_count(&self) -> usize {
        self.state().writes.len()
    }

    /// Command texts (without framing) written since index `from`.
    pub fn commands_since(&self, from: usize) -> Vec<String> {
        self.state().writes[from..]
            .iter()
            .filter_map(|w| {
                let text = String::from_utf8_lossy(w);
                text.find(EOM_TRAILER).map(|idx| text[..idx].to_string())
            })
            .collect()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state().dirs.contains(path)
    }

    /// Queue output as if a running script printed it.
    pub fn push_output(&self, text: &str) {
        self.state().pending.extend(text.bytes());
    }
}

impl Link for FakeBoard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        let n = buf.len().min(state.pending.len());
        for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.state().handle(data);
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.state().pending.clear();
        Ok(())
    }

    fn bytes_to_read(&mut self) -> io::Result<usize> {
        Ok(self.state().pending.len())
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let len = text[from..].find(end)?;
    Some(&text[from..from + len])
}

fn failure(message: &str) -> String {
    format!("{}{}\r\n", message, FAILURE_MARKER)
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

impl BoardState {
    fn emit(&mut self, text: &str) {
        self.pending.extend(text.bytes());
    }

    fn handle(&mut self, data: &[u8]) {
        self.writes.push(data.to_vec());
        match data {
            [INTERRUPT] => {
                self.interrupts += 1;
                self.emit("\r\n>>> ");
            }
            [SOFT_REBOOT] => {
                self.reboots += 1;
                self.emit("MPY: soft reboot\r\nMicroPython v1.21.0\r\n>>> ");
            }
            _ => {
                let text = String::from_utf8_lossy(data).into_owned();
                if text == "\r\n" {
                    self.emit("\r\n>>> ");
                } else if let Some(framed) = text.strip_suffix("\r\n") {
                    self.handle_framed(framed);
                } else if let Some(line) = text.strip_suffix('\r') {
                    self.handle_repl_line(line);
                }
            }
        }
    }

    fn handle_framed(&mut self, framed: &str) {
        let (body, is_block) = match framed.strip_suffix("\r\n") {
            Some(body) => (body, true),
            None => (framed, false),
        };
        let Some(command) = body.strip_suffix(EOM_TRAILER) else {
            return;
        };
        if self.silent {
            return;
        }
        let mut reply = format!("{}{}\r\n", command, EOM_TRAILER);
        if is_block {
            reply.push_str("... \r\n");
        }
        if command.starts_with("exec(open(") {
            // The script keeps running, the trailer never gets its turn.
            reply.push_str("tick\r\n");
            self.emit(&reply);
            return;
        }
        reply.push_str(&self.evaluate(command));
        reply.push_str(EOR_MARKER);
        reply.push_str("\r\n>>> ");
        self.emit(&reply);
    }

    fn handle_repl_line(&mut self, line: &str) {
        let mut reply = String::new();
        if self.echo_backspaces {
            reply.push_str("\x08\x08");
        }
        reply.push_str(line);
        reply.push_str("\r\n");
        if line.trim_end().ends_with(':') {
            reply.push_str("... ");
        } else {
            reply.push_str(&self.evaluate(line));
            reply.push_str(">>> ");
        }
        self.emit(&reply);
    }

    fn listing(&self, dir: &str) -> String {
        let names: BTreeSet<&str> = self
            .files
            .keys()
            .chain(self.dirs.iter())
            .filter(|p| parent_of(p) == dir)
            .map(|p| name_of(p))
            .collect();
        let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
        format!("[{}]\r\n", quoted.join(", "))
    }

    fn evaluate(&mut self, command: &str) -> String {
        if command == "x = 1 + 1; print(x)" {
            return self.health_reply.clone();
        }
        if command == "import os; os.listdir()" {
            return self.listing("");
        }
        if let Some(dir) = between(command, "import os; os.listdir('", "')") {
            if !self.dirs.contains(dir) {
                return "Traceback (most recent call last):\r\n  File \"<stdin>\", line 1, in <module>\r\nOSError: [Errno 2] ENOENT\r\n".to_string();
            }
            return self.listing(dir);
        }
        if let Some(hex_data) = between(command, "bytes.fromhex(\\'", "\\')") {
            let path = between(command, "open(\\\"", "\\\", \\\"wb\\\")").unwrap_or_default();
            let data = decode_upload(hex_data).unwrap_or_default();
            self.files.insert(path.to_string(), data);
            return String::new();
        }
        if let Some(path) = between(command, "os.mkdir(\\\"", "\\\")") {
            if self.dirs.contains(path) || self.files.contains_key(path) {
                return failure("[Errno 17] EEXIST");
            }
            self.dirs.insert(path.to_string());
            return String::new();
        }
        if command.contains("_remove_tree") {
            let path = between(command, "os.stat(\\\"", "\\\")").unwrap_or_default();
            return self.delete(path, command.contains("if True:"));
        }
        if let Some(path) = between(command, "open(\\'", "\\', \\'r\\')") {
            return match self.files.get(path) {
                Some(data) => String::from_utf8_lossy(data).replace('\n', "\r\n"),
                None => failure("[Errno 2] ENOENT"),
            };
        }
        if command.contains("1/0") {
            if command.contains(FAILURE_MARKER) {
                return failure("division by zero");
            }
            return TRACEBACK_DIVISION.to_string();
        }
        if command.starts_with("for i in range(2)") {
            return "0\r\n1\r\n".to_string();
        }
        if let Some(arg) = between(command, "print(", ")") {
            return format!("{}\r\n", arg);
        }
        String::new()
    }

    fn delete(&mut self, path: &str, recursive: bool) -> String {
        if self.files.remove(path).is_some() {
            return String::new();
        }
        if !self.dirs.contains(path) {
            return failure("[Errno 2] ENOENT");
        }
        let prefix = format!("{}/", path);
        let has_children = self.files.keys().chain(self.dirs.iter()).any(|p| p.starts_with(&prefix));
        if has_children && !recursive {
            return failure("[Errno 39] ENOTEMPTY");
        }
        self.files.retain(|p, _| !p.starts_with(&prefix));
        self.dirs.retain(|p| p != path && !p.starts_with(&prefix));
        String::new()
    }
}
