//! Board detection over the host's serial ports.
//!
//! A port holds a MicroPython board when a session can be opened on it:
//! the reset sequence completes and the health check answers `2`.

use std::time::Duration;

use picox_session::{Session, SessionConfig, SessionError, TransportError};
use serialport::SerialPortType;
use tracing::{debug, warn};

/// Timeouts used while probing, much shorter than a normal session's.
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Device name prefixes of USB CDC serial ports.
const USB_NAME_PREFIXES: &[&str] = &["/dev/ttyACM", "/dev/ttyUSB", "/dev/tty.usb", "/dev/cu.usb"];

/// USB serial ports of this host.
///
/// Ports whose type the platform cannot tell are recognised by name.
pub fn usb_serial_ports() -> anyhow::Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .filter(|p| {
            matches!(p.port_type, SerialPortType::UsbPort(_)) || is_usb_serial_name(&p.port_name)
        })
        .map(|p| p.port_name)
        .collect())
}

fn is_usb_serial_name(name: &str) -> bool {
    USB_NAME_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Check whether a MicroPython board answers on `port`.
pub fn probe(port: &str, baud_rate: u32) -> bool {
    let config = SessionConfig::new(port)
        .with_baud_rate(baud_rate)
        .with_read_timeout(PROBE_TIMEOUT)
        .with_write_timeout(PROBE_TIMEOUT);
    match Session::open(config) {
        Ok(_) => true,
        Err(SessionError::Transport(TransportError::Serial(e)))
            if e.kind() == serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) =>
        {
            warn!("[{}] :: permission denied", port);
            false
        }
        Err(e) => {
            debug!("[{}] :: not a board: {}", port, e);
            false
        }
    }
}

/// Probe `ports` in order, stopping at the first board unless `all` is set.
pub fn find_boards<F>(ports: &[String], all: bool, mut is_board: F) -> Vec<String>
where
    F: FnMut(&str) -> bool,
{
    let mut found = Vec::new();
    for port in ports {
        if is_board(port) {
            found.push(port.clone());
            if !all {
                break;
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> Vec<String> {
        ["/dev/ttyACM0", "/dev/ttyACM1", "/dev/ttyACM2"]
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    #[test]
    fn test_first_board_only() {
        let mut probed = Vec::new();
        let found = find_boards(&ports(), false, |p| {
            probed.push(p.to_string());
            p != "/dev/ttyACM0"
        });
        assert_eq!(found, vec!["/dev/ttyACM1"]);
        assert_eq!(probed.len(), 2);
    }

    #[test]
    fn test_all_boards() {
        let found = find_boards(&ports(), true, |p| p != "/dev/ttyACM1");
        assert_eq!(found, vec!["/dev/ttyACM0", "/dev/ttyACM2"]);
    }

    #[test]
    fn test_usb_names() {
        assert!(is_usb_serial_name("/dev/ttyACM0"));
        assert!(is_usb_serial_name("/dev/tty.usbmodem1101"));
        assert!(!is_usb_serial_name("/dev/ttyS0"));
    }

    #[test]
    fn test_no_boards() {
        assert!(find_boards(&ports(), true, |_| false).is_empty());
    }
}
