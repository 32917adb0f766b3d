//! Session controller.
//!
//! A [`Session`] owns the transport to one board and turns the interactive
//! console into request/response calls. Every higher-level operation is
//! built on [`Session::run`].

use std::thread;

use picox_protocol::{
    check_traceback, clean_response, Command, EOR_TOKEN, INTERRUPT, SOFT_REBOOT, TERMINATOR,
};
use tracing::{debug, info, warn, Span};

use crate::config::{OpenPolicy, SessionConfig};
use crate::error::{Result, SessionError, TransportError};
use crate::link::Link;
use crate::transport::Transport;

/// Command used to check that the board answers.
pub const HEALTH_CHECK_COMMAND: &str = "x = 1 + 1; print(x)";

/// Expected answer to [`HEALTH_CHECK_COMMAND`].
pub const HEALTH_CHECK_RESPONSE: &str = "2";

/// Number of interrupts sent in each burst of the reset sequence.
const INTERRUPT_BURST: usize = 5;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, the board may be in any state.
    Uninitialized,
    /// Reset completed, the interpreter sits at its prompt.
    Idle,
    /// Health check passed.
    Ready,
    /// Closed, every operation fails.
    Closed,
}

/// A request/response session with one MicroPython board.
pub struct Session {
    pub(crate) transport: Transport,
    pub(crate) config: SessionConfig,
    state: SessionState,
}

impl Session {
    /// Create a session as described by the configuration.
    ///
    /// With [`OpenPolicy::Open`] the port is opened and the configured reset
    /// and health check run immediately. With [`OpenPolicy::Deferred`]
    /// nothing happens until [`connect`](Self::connect).
    pub fn open(config: SessionConfig) -> Result<Self> {
        let transport = Transport::deferred(&config);
        let mut session = Session::from_transport(transport, config);
        if session.config.open == OpenPolicy::Open {
            session.connect()?;
        }
        Ok(session)
    }

    /// Create a session over an existing link and apply the open policy.
    pub fn with_link(link: Box<dyn Link>, config: SessionConfig) -> Result<Self> {
        let transport = Transport::with_link(link, &config);
        Self::start(transport, config)
    }

    /// Like [`with_link`](Self::with_link), logging inside `span` instead of
    /// the default `picox{port=..}` span.
    pub fn with_link_and_span(
        link: Box<dyn Link>,
        config: SessionConfig,
        span: Span,
    ) -> Result<Self> {
        let transport = Transport::with_link(link, &config).with_span(span);
        Self::start(transport, config)
    }

    fn start(transport: Transport, config: SessionConfig) -> Result<Self> {
        let mut session = Session::from_transport(transport, config);
        session.apply_open_policy()?;
        Ok(session)
    }

    fn from_transport(transport: Transport, config: SessionConfig) -> Self {
        Session {
            transport,
            config,
            state: SessionState::Uninitialized,
        }
    }

    /// Open the port if needed, then reset and health-check as configured.
    pub fn connect(&mut self) -> Result<()> {
        self.transport.connect(&self.config)?;
        self.state = SessionState::Uninitialized;
        self.apply_open_policy()
    }

    fn apply_open_policy(&mut self) -> Result<()> {
        if self.config.reset_on_open {
            self.reset_to_idle()?;
        }
        if self.config.health_check_on_open && !self.health_check()? {
            return Err(SessionError::HealthCheckFailed {
                port: self.config.port.clone(),
            });
        }
        let _enter = self.transport.span().enter();
        info!(
            "session on {} ready (MicroPython {}, state {:?})",
            self.config.port, self.config.version, self.state
        );
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Port name.
    pub fn port(&self) -> &str {
        self.transport.port()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Closed || !self.transport.is_open() {
            return Err(TransportError::NotOpen {
                port: self.config.port.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Force the interpreter into an idle prompt from any state.
    ///
    /// Interrupts whatever runs, soft-reboots, then interrupts again in case
    /// the board started an autorun script on boot, and finally sends a blank
    /// line to leave any half-entered block. Safe to call repeatedly.
    pub fn reset_to_idle(&mut self) -> Result<()> {
        self.ensure_open()?;
        {
            let _enter = self.transport.span().enter();
            debug!("resetting {} to idle", self.config.port);
        }
        self.send_interrupts()?;
        self.soft_reboot()?;
        thread::sleep(self.config.settle_interval);
        self.send_interrupts()?;
        thread::sleep(self.config.settle_interval);
        self.transport.write(TERMINATOR.as_bytes())?;
        self.transport.clear()?;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Stop any running script. Same as [`reset_to_idle`](Self::reset_to_idle).
    pub fn stop_exec(&mut self) -> Result<()> {
        self.reset_to_idle()
    }

    fn send_interrupts(&mut self) -> Result<()> {
        for _ in 0..INTERRUPT_BURST {
            self.transport.write(&[INTERRUPT])?;
        }
        Ok(())
    }

    /// Send the soft reboot control byte.
    pub fn soft_reboot(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.transport.write(&[SOFT_REBOOT])?;
        Ok(())
    }

    /// Check that the board evaluates a trivial command correctly.
    pub fn health_check(&mut self) -> Result<bool> {
        let response = self.run(&Command::new(HEALTH_CHECK_COMMAND))?;
        let healthy = response == HEALTH_CHECK_RESPONSE;
        if healthy {
            self.state = SessionState::Ready;
        } else {
            let _enter = self.transport.span().enter();
            warn!("health check on {} returned {:?}", self.config.port, response);
        }
        Ok(healthy)
    }

    /// Send a command and return its cleaned output.
    ///
    /// Commands that ignore their response return an empty string as soon
    /// as they are written.
    pub fn run(&mut self, command: &Command) -> Result<String> {
        self.ensure_open()?;
        self.transport.write(&command.encode())?;
        if command.ignores_response() {
            return Ok(String::new());
        }
        let raw = self.transport.read_until(EOR_TOKEN)?;
        Ok(clean_response(&String::from_utf8_lossy(&raw))?)
    }

    /// Run arbitrary Python and return its output.
    ///
    /// Unlike compiled commands, plain statements are not wrapped in a
    /// failure handler, so a traceback in the output is reported as a remote
    /// error.
    pub fn run_python(&mut self, source: &str, is_block: bool) -> Result<String> {
        let output = self.run(&Command::new(source).with_block(is_block))?;
        check_traceback(&output)?;
        Ok(output)
    }

    /// Stop whatever runs and start executing a script stored on the board.
    ///
    /// Does not wait for the script to finish.
    pub fn execute_file(&mut self, name: &str) -> Result<()> {
        crate::files::validate_remote_path(name)?;
        self.stop_exec()?;
        {
            let _enter = self.transport.span().enter();
            info!("executing {} on {}", name, self.config.port);
        }
        let command = Command::new(format!("exec(open(\"{}\").read())", name)).ignoring_response();
        self.run(&command)?;
        Ok(())
    }

    /// Close the session. Later operations fail with `NotOpen`.
    pub fn close(&mut self) {
        self.transport.close();
        self.state = SessionState::Closed;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.transport.close();
    }
}
