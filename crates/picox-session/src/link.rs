//! Byte channel abstraction.
//!
//! [`Transport`](crate::Transport) talks to a [`Link`] rather than a serial
//! port directly, so sessions can run against an in-memory board in tests.

use std::io::{self, Read, Write};

use serialport::{ClearBuffer, SerialPort};

use crate::config::SessionConfig;
use crate::error::TransportError;

/// A bidirectional byte channel to a board.
pub trait Link: Send {
    /// Read whatever is available, blocking up to the link's own timeout.
    ///
    /// Returning `Ok(0)` or an error of kind `TimedOut` means nothing arrived.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all bytes.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Discard pending input and output.
    fn clear(&mut self) -> io::Result<()>;

    /// Number of bytes that can be read without blocking.
    fn bytes_to_read(&mut self) -> io::Result<usize>;
}

/// A [`Link`] over a real serial port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open the port described by the configuration.
    ///
    /// The port timeout is the write timeout; reads poll in short slices and
    /// enforce the read timeout themselves.
    pub fn open(config: &SessionConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.write_timeout)
            .open()?;
        Ok(SerialLink { port })
    }

    /// Wrap an already opened port.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        SerialLink { port }
    }
}

impl Link for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn clear(&mut self) -> io::Result<()> {
        Ok(self.port.clear(ClearBuffer::All)?)
    }

    fn bytes_to_read(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }
}
