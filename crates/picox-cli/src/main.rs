//! picox - drive a MicroPython board over its serial console
//!
//! Usage:
//!   picox detect [--all]
//!   picox ls <device> [path]
//!   picox upload <device> <local> <remote> [--overwrite]
//!   picox download <device> <remote> <local>
//!   picox repl <device>
//!   picox compile <templates> <out.json>

mod detect;

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use picox_session::{CancelFlag, Session, SessionConfig, SessionError, DEFAULT_BAUD_RATE};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code after Ctrl+C, as a shell reports SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "picox")]
#[command(version, about = "Drive a MicroPython board over its serial console")]
struct Cli {
    /// Enable debug logging, including every byte sent and received
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Seconds to wait for a complete response
    #[arg(long, global = true, default_value_t = 15, value_name = "SECS")]
    read_timeout: u64,

    /// Serial baud rate
    #[arg(long, global = true, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct Device {
    /// Serial device of the board (e.g. /dev/ttyACM0 or COM3)
    device: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find boards on USB serial ports
    Detect {
        /// Report every board instead of the first
        #[arg(long)]
        all: bool,
    },
    /// Start an interactive REPL on the board
    Repl {
        #[command(flatten)]
        device: Device,
    },
    /// List a directory on the board
    Ls {
        #[command(flatten)]
        device: Device,
        /// Directory to list (current directory if omitted)
        path: Option<String>,
    },
    /// Upload a local file
    Upload {
        #[command(flatten)]
        device: Device,
        /// File to upload
        local: PathBuf,
        /// Name to save it under on the board
        remote: String,
        /// Replace the remote file if it exists
        #[arg(long)]
        overwrite: bool,
    },
    /// Download a file from the board
    Download {
        #[command(flatten)]
        device: Device,
        /// File on the board
        remote: String,
        /// Where to save it
        local: PathBuf,
    },
    /// Stop whatever runs and execute a file stored on the board
    Exec {
        #[command(flatten)]
        device: Device,
        /// File on the board
        file: String,
    },
    /// Stop whatever runs on the board
    Stop {
        #[command(flatten)]
        device: Device,
    },
    /// Show console output of a running script without interrupting it
    Attach {
        #[command(flatten)]
        device: Device,
    },
    /// Soft reboot the board
    Reboot {
        #[command(flatten)]
        device: Device,
    },
    /// Create a directory on the board
    Mkdir {
        #[command(flatten)]
        device: Device,
        path: String,
    },
    /// Delete a file or directory on the board
    Rm {
        #[command(flatten)]
        device: Device,
        path: String,
        /// Delete a directory and everything in it
        #[arg(short, long)]
        recursive: bool,
    },
    /// Run a line of Python and print its output
    Run {
        #[command(flatten)]
        device: Device,
        python: String,
        /// The line opens an indented block (for, with, ...)
        #[arg(long)]
        block: bool,
    },
    /// Compile a directory of command templates into a JSON command set
    Compile {
        /// Directory holding *.py templates
        templates: PathBuf,
        /// Output JSON file
        out: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Install a Ctrl+C handler that sets the returned flag.
fn cancel_on_ctrlc() -> CancelFlag {
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.cancel()) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }
    cancel
}

fn session_config(cli: &Cli, device: &Device) -> SessionConfig {
    SessionConfig::new(&device.device)
        .with_baud_rate(cli.baud)
        .with_read_timeout(Duration::from_secs(cli.read_timeout))
}

fn open(config: SessionConfig) -> anyhow::Result<Session> {
    let port = config.port.clone();
    Session::open(config).with_context(|| format!("Failed to open session on {}", port))
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Detect { all } => {
            let ports = detect::usb_serial_ports().context("Failed to list serial ports")?;
            let found = detect::find_boards(&ports, *all, |port| detect::probe(port, cli.baud));
            if found.is_empty() {
                info!("No board found on {} USB serial ports", ports.len());
            }
            for port in found {
                println!("{}", port);
            }
        }
        Commands::Repl { device } => {
            let mut session = open(session_config(cli, device))?;
            // Until the handler is installed, Ctrl+C ends the process.
            let cancel = cancel_on_ctrlc();
            session.repl(BufReader::new(io::stdin()), io::stdout(), &cancel)?;
        }
        Commands::Ls { device, path } => {
            let mut session = open(session_config(cli, device))?;
            for name in session.list_dir(path.as_deref())? {
                println!("{}", name);
            }
        }
        Commands::Upload {
            device,
            local,
            remote,
            overwrite,
        } => {
            let file = File::open(local)
                .with_context(|| format!("Failed to open {}", local.display()))?;
            let mut session = open(session_config(cli, device))?;
            session.upload_from(file, remote, *overwrite)?;
            info!("Uploaded {} to {}", local.display(), remote);
        }
        Commands::Download {
            device,
            remote,
            local,
        } => {
            let mut session = open(session_config(cli, device))?;
            let file = File::create(local)
                .with_context(|| format!("Failed to create {}", local.display()))?;
            let written = session.download(remote, &mut BufWriter::new(file))?;
            info!("Downloaded {} ({} bytes) to {}", remote, written, local.display());
        }
        Commands::Exec { device, file } => {
            let mut session = open(session_config(cli, device))?;
            session.execute_file(file)?;
        }
        Commands::Stop { device } => {
            // Opening a session resets the board, which stops any script.
            open(session_config(cli, device))?;
        }
        Commands::Attach { device } => {
            let config = SessionConfig::attach(&device.device)
                .with_baud_rate(cli.baud)
                .with_read_timeout(Duration::from_secs(cli.read_timeout));
            let mut session = open(config)?;
            let cancel = cancel_on_ctrlc();
            session.attach(io::stdout(), &cancel)?;
            info!("Detached from {}", device.device);
        }
        Commands::Reboot { device } => {
            let mut session = open(session_config(cli, device))?;
            session.soft_reboot()?;
        }
        Commands::Mkdir { device, path } => {
            let mut session = open(session_config(cli, device))?;
            session.mkdir(path)?;
        }
        Commands::Rm {
            device,
            path,
            recursive,
        } => {
            let mut session = open(session_config(cli, device))?;
            session.delete(path, *recursive)?;
        }
        Commands::Run {
            device,
            python,
            block,
        } => {
            let mut session = open(session_config(cli, device))?;
            let output = session.run_python(python, *block)?;
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Commands::Compile { templates, out } => {
            let commands = picox_compiler::compile_dir(templates)
                .with_context(|| format!("Failed to compile {}", templates.display()))?;
            commands
                .save(out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            info!("Wrote {} commands to {}", commands.len(), out.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if matches!(e.downcast_ref::<SessionError>(), Some(SessionError::Interrupted)) => {
            info!("Interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
