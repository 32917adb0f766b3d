//! Synchronous byte transport with marker-aware reads.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use picox_protocol::{FAILURE_MARKER, FAILURE_MARKER_THRESHOLD};
use tracing::{debug, info, info_span, trace, Span};

use crate::config::SessionConfig;
use crate::error::TransportError;
use crate::link::{Link, SerialLink};
use crate::repl::CancelFlag;

/// Size of a single read from the link.
const READ_CHUNK_SIZE: usize = 512;

/// Back-off when a read returned nothing.
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Exclusive owner of the channel to one board.
pub struct Transport {
    port: String,
    link: Option<Box<dyn Link>>,
    read_timeout: Duration,
    span: Span,
}

impl Transport {
    /// Open the serial port named in the configuration.
    pub fn open(config: &SessionConfig) -> Result<Self, TransportError> {
        let mut transport = Transport::deferred(config);
        transport.connect(config)?;
        Ok(transport)
    }

    /// Create a transport without opening the port.
    pub fn deferred(config: &SessionConfig) -> Self {
        Transport {
            port: config.port.clone(),
            link: None,
            read_timeout: config.read_timeout,
            span: default_span(&config.port),
        }
    }

    /// Create a transport over an existing link.
    pub fn with_link(link: Box<dyn Link>, config: &SessionConfig) -> Self {
        Transport {
            link: Some(link),
            ..Transport::deferred(config)
        }
    }

    /// Log inside `span` instead of the default `picox{port=..}` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Open the serial port if it is not open yet.
    pub fn connect(&mut self, config: &SessionConfig) -> Result<(), TransportError> {
        if self.link.is_none() {
            let _enter = self.span.enter();
            info!("opening {} at {} baud", config.port, config.baud_rate);
            self.link = Some(Box::new(SerialLink::open(config)?));
        }
        Ok(())
    }

    /// Close the channel. Later operations fail with `NotOpen`.
    pub fn close(&mut self) {
        if self.link.take().is_some() {
            let _enter = self.span.enter();
            debug!("closed {}", self.port);
        }
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Port name.
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Span that transport and session logging happens in.
    pub fn span(&self) -> &Span {
        &self.span
    }

    fn link(&mut self) -> Result<&mut Box<dyn Link>, TransportError> {
        let port = &self.port;
        self.link
            .as_mut()
            .ok_or_else(|| TransportError::NotOpen { port: port.clone() })
    }

    /// Discard pending input and output.
    pub fn clear(&mut self) -> Result<(), TransportError> {
        self.link()?.clear()?;
        Ok(())
    }

    /// Write bytes after discarding anything still pending.
    ///
    /// Clearing first guarantees a late straggler from the previous command
    /// is never read as part of the next response.
    pub fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let _enter = self.span.enter();
        let link = self.link.as_mut().ok_or_else(|| TransportError::NotOpen {
            port: self.port.clone(),
        })?;
        link.clear()?;
        debug!("SEND {} :: {:?}", self.port, String::from_utf8_lossy(data));
        link.write_all(data)?;
        Ok(())
    }

    /// Read until `token` has been received.
    ///
    /// The result ends with the token; anything that arrived after it in the
    /// same chunk is dropped.
    ///
    /// Also returns early once [`FAILURE_MARKER`] has been seen
    /// [`FAILURE_MARKER_THRESHOLD`] times: once in the echoed command and
    /// once more when the command reports an exception.
    ///
    /// Fails with `Timeout` once the read timeout elapses, even while the
    /// board is still sending.
    pub fn read_until(&mut self, token: &str) -> Result<Vec<u8>, TransportError> {
        let span = self.span.clone();
        let _enter = span.enter();
        let deadline = Instant::now() + self.read_timeout;
        let mut buffer = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut failures = MarkerCounter::new(FAILURE_MARKER.as_bytes());

        loop {
            let n = self.read_chunk(&mut chunk)?;
            if n > 0 {
                buffer.extend_from_slice(&chunk[..n]);
                if let Some(end) = token_end(&buffer, n, token) {
                    // Bytes after the token belong to the next prompt.
                    buffer.truncate(end);
                    break;
                }
                if let Some(end) = failures.feed(&buffer, FAILURE_MARKER_THRESHOLD) {
                    trace!("failure marker threshold reached");
                    buffer.truncate(end);
                    break;
                }
            }
            if Instant::now() >= deadline {
                return Err(timeout(token, &buffer));
            }
            if n == 0 {
                thread::sleep(IDLE_BACKOFF);
            }
        }

        debug!("RECV {} :: {:?}", self.port, String::from_utf8_lossy(&buffer));
        Ok(buffer)
    }

    /// Read interactive output until one of `tokens` has been received and
    /// the board has gone quiet for `quiet`.
    ///
    /// Whatever arrived is returned when the read timeout elapses or `cancel`
    /// is set; only a completely silent board is a timeout.
    pub fn read_until_any(
        &mut self,
        tokens: &[&str],
        quiet: Duration,
        cancel: &CancelFlag,
    ) -> Result<Vec<u8>, TransportError> {
        let span = self.span.clone();
        let _enter = span.enter();
        let deadline = Instant::now() + self.read_timeout;
        let mut buffer = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                debug!("read cancelled after {} bytes", buffer.len());
                return Ok(buffer);
            }
            let n = self.read_chunk(&mut chunk)?;
            if n == 0 {
                thread::sleep(IDLE_BACKOFF);
                continue;
            }
            buffer.extend_from_slice(&chunk[..n]);
            if tokens.iter().any(|t| token_end(&buffer, n, t).is_some()) {
                thread::sleep(quiet);
                if self.link()?.bytes_to_read()? == 0 {
                    break;
                }
            }
        }

        if buffer.is_empty() {
            return Err(timeout(&tokens.join(" | "), &buffer));
        }
        debug!("RECV {} :: {:?}", self.port, String::from_utf8_lossy(&buffer));
        Ok(buffer)
    }

    /// Read whatever is available without blocking.
    pub fn poll_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let span = self.span.clone();
        let _enter = span.enter();
        let link = self.link()?;
        let available = link.bytes_to_read()?;
        if available == 0 {
            return Ok(Vec::new());
        }
        let mut buffer = vec![0u8; available];
        let n = read_ignoring_timeout(&mut **link, &mut buffer)?;
        buffer.truncate(n);
        if n > 0 {
            debug!("RECV {} :: {:?}", self.port, String::from_utf8_lossy(&buffer));
        }
        Ok(buffer)
    }

    fn read_chunk(&mut self, chunk: &mut [u8]) -> Result<usize, TransportError> {
        let link = self.link()?;
        Ok(read_ignoring_timeout(&mut **link, chunk)?)
    }
}

fn default_span(port: &str) -> Span {
    info_span!("picox", port = %port)
}

fn read_ignoring_timeout(link: &mut dyn Link, buf: &mut [u8]) -> io::Result<usize> {
    match link.read(buf) {
        Ok(n) => Ok(n),
        Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => Ok(0),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
        Err(e) => Err(e),
    }
}

fn timeout(token: &str, received: &[u8]) -> TransportError {
    TransportError::Timeout {
        token: token.to_string(),
        received: String::from_utf8_lossy(received).into_owned(),
    }
}

/// End offset of the first `token` that finishes within the last `fresh`
/// bytes of `buffer`.
fn token_end(buffer: &[u8], fresh: usize, token: &str) -> Option<usize> {
    let token = token.as_bytes();
    if token.is_empty() || buffer.len() < token.len() {
        return None;
    }
    let start = buffer.len().saturating_sub(fresh + token.len() - 1);
    buffer[start..]
        .windows(token.len())
        .position(|w| w == token)
        .map(|i| start + i + token.len())
}

/// Counts non-overlapping occurrences of a marker in a growing buffer,
/// scanning each byte once.
struct MarkerCounter<'a> {
    needle: &'a [u8],
    seen: usize,
    scanned: usize,
}

impl<'a> MarkerCounter<'a> {
    fn new(needle: &'a [u8]) -> Self {
        MarkerCounter {
            needle,
            seen: 0,
            scanned: 0,
        }
    }

    /// Scan what was appended since the last call. Returns the end offset of
    /// the `threshold`th occurrence once it has been seen.
    fn feed(&mut self, buffer: &[u8], threshold: usize) -> Option<usize> {
        let len = self.needle.len();
        if len == 0 || threshold == 0 {
            return None;
        }
        while self.scanned + len <= buffer.len() {
            if &buffer[self.scanned..self.scanned + len] == self.needle {
                self.seen += 1;
                self.scanned += len;
                if self.seen == threshold {
                    return Some(self.scanned);
                }
            } else {
                self.scanned += 1;
            }
        }
        None
    }
}
