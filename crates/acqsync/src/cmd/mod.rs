use clap::{ArgGroup, Args, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use acqsync_frame::DeviceClass;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod mark;
pub mod record;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acquire samples and merge network markers, optionally recording them.
    Record(RecordArgs),
    /// Send marker labels to a running recording.
    Mark(MarkArgs),
    /// Decode a recorded frame dump.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Record(args) => record::run(args, format),
        Command::Mark(args) => mark::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum ClassArg {
    #[default]
    Research,
    Consumer,
}

impl From<ClassArg> for DeviceClass {
    fn from(class: ClassArg) -> Self {
        match class {
            ClassArg::Research => DeviceClass::Research,
            ClassArg::Consumer => DeviceClass::Consumer,
        }
    }
}

/// Headset identity shared by `record` and `decode`.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Device serial number (at least 16 characters).
    #[arg(long, env = "ACQSYNC_SERIAL")]
    pub serial: String,
    /// Device class; selects the key schedule.
    #[arg(long, value_name = "CLASS", default_value = "research")]
    pub class: ClassArg,
    /// Electrodes tracked for contact quality.
    #[arg(long, default_value_t = 14, value_parser = clap::value_parser!(u8).range(1..=14))]
    pub channels: u8,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["device", "replay"])))]
pub struct RecordArgs {
    /// Device node to read frames from (e.g. /dev/hidraw0).
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,
    /// Recorded frame dump to replay instead of a device.
    #[arg(long, value_name = "PATH")]
    pub replay: Option<PathBuf>,
    #[command(flatten)]
    pub device_args: DeviceArgs,
    /// Address the marker listener binds to.
    #[arg(long, default_value = "127.0.0.1:12345")]
    pub listen: SocketAddr,
    /// Record to <BASE>.eeg, <BASE>.marker and <BASE>.meta.
    #[arg(long, value_name = "BASE")]
    pub save: Option<PathBuf>,
    /// Stop after N blocks.
    #[arg(long)]
    pub blocks: Option<u64>,
    /// Pause before merging markers into each block (e.g. 200us, 1ms).
    #[arg(long, default_value = "200us")]
    pub settle_delay: String,
    /// Keep only network markers; used to measure marker latency.
    #[arg(long)]
    pub debug_network_only: bool,
}

#[derive(Args, Debug)]
pub struct MarkArgs {
    /// Labels to send, in order.
    #[arg(required = true)]
    pub labels: Vec<String>,
    /// Address of the marker listener.
    #[arg(long, default_value = "127.0.0.1:12345")]
    pub addr: SocketAddr,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Pause between labels (e.g. 100ms).
    #[arg(long)]
    pub interval: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame dump to decode.
    pub path: PathBuf,
    #[command(flatten)]
    pub device_args: DeviceArgs,
    /// Stop after N frames.
    #[arg(long)]
    pub limit: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150us`, `2ms`, `5s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("us") {
        (num, "us")
    } else if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(match unit {
        "us" => Duration::from_micros(value),
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

/// Like [`parse_duration`] but rejects zero.
pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let timeout = parse_duration(input)?;
    if timeout.is_zero() {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }
    Ok(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("200us").unwrap(), Duration::from_micros(200));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("0us").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_timeout("0s").is_err());
    }
}
