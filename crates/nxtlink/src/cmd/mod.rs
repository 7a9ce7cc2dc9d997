use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use nxtlink_channel::{Channel, ChannelConfig, ChannelEvent, Intent};
use nxtlink_frame::{Port, MAX_WRITE_CHUNK};
use nxtlink_transport::{BtAddr, DeviceAddress, SerialConfig, SerialConnector};
use tracing::{info, warn};

use crate::exit::{channel_error, transport_error, CliError, CliResult, FAILURE, TIMEOUT, USAGE};
use crate::output::OutputFormat;

pub mod beep;
pub mod files;
pub mod firmware;
pub mod motor;
pub mod position;
pub mod program;
pub mod upload;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a tone on the brick.
    Beep(BeepArgs),
    /// Run or rotate a motor.
    Motor(MotorArgs),
    /// Read a motor's rotation counter.
    Position(PositionArgs),
    /// Show the brick's firmware version and capability.
    Firmware(FirmwareArgs),
    /// List files stored on the brick.
    Files(FilesArgs),
    /// Start, stop or query the running program.
    Program(ProgramArgs),
    /// Upload a file to the brick.
    Upload(UploadArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Beep(args) => beep::run(args, format),
        Command::Motor(args) => motor::run(args, format),
        Command::Position(args) => position::run(args, format),
        Command::Firmware(args) => firmware::run(args, format),
        Command::Files(args) => files::run(args, format),
        Command::Program(args) => program::run(args, format),
        Command::Upload(args) => upload::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to reach the brick.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Device path (/dev/rfcomm0, COM5) or Bluetooth address of the brick.
    #[arg(long, short = 'd', env = "NXTLINK_DEVICE", value_name = "ADDRESS")]
    pub device: String,
    /// Map a Bluetooth address to the device path it is bound to.
    #[arg(long = "bind", value_name = "MAC=PATH")]
    pub bindings: Vec<String>,
    /// Serial baud rate.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Maximum time to wait for a reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub reply_timeout: String,
    /// The brick is being paired; connect failures ask to accept pairing.
    #[arg(long)]
    pub pairing: bool,
}

impl LinkArgs {
    pub fn address(&self) -> CliResult<DeviceAddress> {
        self.device
            .parse()
            .map_err(|err| transport_error("invalid --device", err))
    }

    pub fn connector(&self) -> CliResult<SerialConnector> {
        let mut connector = SerialConnector::new(SerialConfig {
            baud_rate: self.baud,
            ..SerialConfig::default()
        });
        for binding in &self.bindings {
            let (mac, path) = parse_binding(binding)?;
            connector.bind(mac, path);
        }
        Ok(connector)
    }

    pub fn channel_config(&self) -> CliResult<ChannelConfig> {
        Ok(ChannelConfig {
            reply_timeout: parse_duration(&self.reply_timeout)?,
            pairing: self.pairing,
            ..ChannelConfig::default()
        })
    }
}

fn parse_binding(input: &str) -> CliResult<(BtAddr, PathBuf)> {
    let (mac, path) = input
        .split_once('=')
        .ok_or_else(|| CliError::new(USAGE, format!("binding must be MAC=PATH: {input}")))?;
    let mac = mac
        .trim()
        .parse::<BtAddr>()
        .map_err(|err| transport_error("invalid --bind", err))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(CliError::new(USAGE, format!("binding has no device path: {input}")));
    }
    Ok((mac, PathBuf::from(path)))
}

#[derive(Args, Debug)]
pub struct BeepArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Tone frequency in Hz.
    #[arg(long, default_value_t = 440)]
    pub frequency: u16,
    /// Tone length (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub duration: String,
    /// Number of tones.
    #[arg(long, default_value_t = 1)]
    pub count: u32,
}

#[derive(Args, Debug)]
pub struct MotorArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Output port (A, B or C).
    #[arg(long, short = 'p')]
    pub port: Port,
    /// Power in percent, -100 to 100.
    #[arg(long, default_value_t = 75, allow_hyphen_values = true)]
    pub power: i32,
    /// How long to run before stopping (e.g. 2s).
    #[arg(long = "for", default_value = "1s", conflicts_with = "rotate")]
    pub run_for: String,
    /// Rotate by this many degrees instead of running for a time.
    #[arg(long)]
    pub rotate: Option<u32>,
}

#[derive(Args, Debug)]
pub struct PositionArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Output port (A, B or C).
    #[arg(long, short = 'p')]
    pub port: Port,
    /// Reset the counter before reading it.
    #[arg(long)]
    pub reset: bool,
}

#[derive(Args, Debug)]
pub struct FirmwareArgs {
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct FilesArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Search pattern.
    #[arg(long, default_value = nxtlink_channel::intent::ALL_FILES)]
    pub pattern: String,
    /// Only list files the brick can run.
    #[arg(long)]
    pub programs: bool,
}

#[derive(Args, Debug)]
pub struct ProgramArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(subcommand)]
    pub action: ProgramAction,
}

#[derive(Subcommand, Debug)]
pub enum ProgramAction {
    /// Start a program stored on the brick.
    Start { name: String },
    /// Stop the running program.
    Stop,
    /// Show the running program.
    Current,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// File to upload: a path, or a resource name looked up in --bundle.
    pub file: String,
    /// Directory holding bundled resources.
    #[arg(long, value_name = "DIR")]
    pub bundle: Option<PathBuf>,
    /// Bytes per write telegram.
    #[arg(long, default_value_t = MAX_WRITE_CHUNK, value_parser = parse_chunk_size)]
    pub chunk_size: usize,
}

fn parse_chunk_size(input: &str) -> Result<usize, String> {
    let size: usize = input.parse().map_err(|_| format!("invalid chunk size: {input}"))?;
    if (1..=MAX_WRITE_CHUNK).contains(&size) {
        Ok(size)
    } else {
        Err(format!("chunk size must be between 1 and {MAX_WRITE_CHUNK}"))
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// A connected [`Channel`] plus its event stream.
pub struct Session {
    channel: Channel,
    events: Receiver<ChannelEvent>,
    reply_timeout: Duration,
}

impl Session {
    pub fn open(link: &LinkArgs) -> CliResult<Self> {
        let address = link.address()?;
        let config = link.channel_config()?;
        let reply_timeout = config.reply_timeout;
        let connector = Arc::new(link.connector()?);

        let (tx, events) = mpsc::channel();
        let channel = Channel::spawn(connector, config, tx)
            .map_err(|err| channel_error("start channel", err))?;
        channel
            .connect(&address)
            .map_err(|err| channel_error("connect", err))?;

        Ok(Self {
            channel,
            events,
            reply_timeout,
        })
    }

    pub fn submit(&self, intent: Intent, delay: Duration) -> CliResult<()> {
        self.channel
            .submit(intent, delay)
            .map_err(|err| channel_error("submit", err))
    }

    /// Wait for the first event `pick` accepts, within the reply timeout.
    pub fn wait_for<T>(
        &self,
        what: &str,
        mut pick: impl FnMut(ChannelEvent) -> Option<T>,
    ) -> CliResult<T> {
        let deadline = Instant::now() + self.reply_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(ChannelEvent::SendError(msg)) | Ok(ChannelEvent::ReceiveError(msg)) => {
                    return Err(CliError::new(FAILURE, format!("{what}: {msg}")));
                }
                Ok(ChannelEvent::Toast(msg)) => info!("{msg}"),
                Ok(event) => {
                    if let Some(found) = pick(event) {
                        return Ok(found);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("{what}: no reply within {:?}", self.reply_timeout),
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CliError::new(FAILURE, format!("{what}: channel stopped")));
                }
            }
        }
    }

    /// Stop the motors and disconnect.
    pub fn close(self) -> CliResult<()> {
        if let Err(err) = self.channel.disconnect() {
            warn!(%err, "disconnect failed");
            return Err(channel_error("disconnect", err));
        }
        Ok(())
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
