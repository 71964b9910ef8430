use std::time::Duration;

use bladelink::frame;
use bladelink::session::{SessionConfig, DEFAULT_PORT};
use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod monitor;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and print events and status changes.
    Monitor(MonitorArgs),
    /// Connect, send one command, optionally wait for a reply.
    Send(SendArgs),
    /// Print the wire frame for a command without connecting.
    Encode(EncodeArgs),
    /// Parse frames and print the resulting events.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

/// Where the device is and how to keep the session alive.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Device host name or IP address.
    #[arg(long, env = "BLADELINK_HOST")]
    pub host: String,
    /// Device TCP port.
    #[arg(long, env = "BLADELINK_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Heartbeat interval (e.g. 1s, 500ms). 0, 0s or 0ms disables heartbeats.
    #[arg(long, default_value = "1s")]
    pub heartbeat: String,
    /// Inbound silence after which the link is considered dead.
    #[arg(long, default_value = "10s")]
    pub timeout: String,
    /// Delay before each reconnect attempt.
    #[arg(long, default_value = "5s")]
    pub reconnect_delay: String,
    /// Name announced to the device with `<SYS|IFID:...>`.
    #[arg(long)]
    pub client_name: Option<String>,
}

impl DeviceArgs {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let config = SessionConfig {
            heartbeat_interval: parse_duration_or_zero(&self.heartbeat)?,
            heartbeat_timeout: parse_duration(&self.timeout)?,
            reconnect_delay: parse_duration(&self.reconnect_delay)?,
            client_name: self.client_name.clone(),
            ..SessionConfig::new(self.host.clone(), self.port)
        };
        config
            .validate()
            .map_err(|err| CliError::new(USAGE, err.to_string()))?;
        Ok(config)
    }
}

/// A command given piecewise on the command line.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Target, e.g. UMIX, DST, SYS.
    #[arg(long)]
    pub target: String,
    /// Sub-address, e.g. 1.2 for mixer 1 channel 2.
    #[arg(long)]
    pub subaddr: Option<String>,
    /// Parameter as KEY=VALUE; repeatable, order is kept.
    #[arg(long = "param", value_name = "KEY=VALUE", conflicts_with = "query")]
    pub params: Vec<String>,
    /// Send a state query (`<TARGET?>`) instead of parameters.
    #[arg(long)]
    pub query: bool,
}

impl FrameArgs {
    pub fn command(&self) -> CliResult<frame::Command> {
        let mut command = if self.query {
            frame::Command::query(self.target.as_str())
        } else {
            frame::Command::new(self.target.as_str())
        };
        if let Some(subaddr) = &self.subaddr {
            command = command.at(subaddr.as_str());
        }
        for param in &self.params {
            let (key, value) = param.split_once('=').ok_or_else(|| {
                CliError::new(USAGE, format!("--param expects KEY=VALUE, got {param:?}"))
            })?;
            command = command.param(key, value);
        }
        Ok(command)
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Subscribe to a mixer parameter as SUBADDR:PARAM (e.g. 1.2:ON); repeatable.
    #[arg(long, value_name = "SUBADDR:PARAM")]
    pub subscribe: Vec<String>,
    /// Exit after receiving N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Wait for one event and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the event when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frames to parse. Reads one frame per line from stdin when omitted.
    pub frames: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Also show platform and session defaults.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let duration = parse_duration_or_zero(input)?;
    if duration.is_zero() {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }
    Ok(duration)
}

/// Like [`parse_duration`], but zero in any unit is accepted.
pub fn parse_duration_or_zero(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

/// Runtime for the commands that talk to a device.
pub fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))
}
