//! Session configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Baud rate of the MicroPython USB serial console.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default time to wait for a complete response.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Default write timeout.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause between the stages of the reset sequence.
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(200);

/// Pause between empty polls in console attach mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// MicroPython firmware version running on the board.
///
/// Informational only: every supported version speaks the same protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MicroPythonVersion {
    V1_19_1,
    V1_20_0,
    #[default]
    V1_21_0,
}

impl fmt::Display for MicroPythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MicroPythonVersion::V1_19_1 => "1.19.1",
            MicroPythonVersion::V1_20_0 => "1.20.0",
            MicroPythonVersion::V1_21_0 => "1.21.0",
        };
        f.write_str(s)
    }
}

/// When the serial port is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenPolicy {
    /// Open the port while constructing the session.
    #[default]
    Open,
    /// Leave the port closed until [`Session::connect`](crate::Session::connect).
    Deferred,
}

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Serial port name (e.g. `/dev/ttyACM0` or `COM3`).
    pub port: String,
    pub baud_rate: u32,
    /// Maximum time to wait for the end of a response.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Pause between the stages of the reset sequence.
    pub settle_interval: Duration,
    /// Pause between empty polls in console attach mode.
    pub poll_interval: Duration,
    pub version: MicroPythonVersion,
    pub open: OpenPolicy,
    /// Force the interpreter into an idle state when connecting.
    pub reset_on_open: bool,
    /// Verify the board answers commands when connecting.
    pub health_check_on_open: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            version: MicroPythonVersion::default(),
            open: OpenPolicy::default(),
            reset_on_open: true,
            health_check_on_open: true,
        }
    }
}

impl SessionConfig {
    /// Create a configuration for the given port with default settings.
    pub fn new(port: impl Into<String>) -> Self {
        SessionConfig {
            port: port.into(),
            ..Default::default()
        }
    }

    /// Configuration for observing a script that is already running.
    ///
    /// Skips the reset and the health check so nothing interrupts the board.
    pub fn attach(port: impl Into<String>) -> Self {
        Self::new(port).with_reset(false).with_health_check(false)
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_version(mut self, version: MicroPythonVersion) -> Self {
        self.version = version;
        self
    }

    /// Defer opening the port until [`Session::connect`](crate::Session::connect).
    pub fn deferred(mut self) -> Self {
        self.open = OpenPolicy::Deferred;
        self
    }

    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset_on_open = reset;
        self
    }

    pub fn with_health_check(mut self, check: bool) -> Self {
        self.health_check_on_open = check;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new("/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.read_timeout, Duration::from_secs(15));
        assert_eq!(config.write_timeout, Duration::from_millis(500));
        assert_eq!(config.open, OpenPolicy::Open);
        assert!(config.reset_on_open);
        assert!(config.health_check_on_open);
    }

    #[test]
    fn test_attach_preset_skips_reset() {
        let config = SessionConfig::attach("COM3");
        assert_eq!(config.port, "COM3");
        assert!(!config.reset_on_open);
        assert!(!config.health_check_on_open);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(MicroPythonVersion::V1_21_0.to_string(), "1.21.0");
    }
}
