mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "acqsync",
    version,
    about = "Biosignal acquisition with network markers"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_record_subcommand() {
        let cli = Cli::try_parse_from([
            "acqsync",
            "record",
            "--replay",
            "/tmp/dump.bin",
            "--serial",
            "SN20120229000459",
            "--save",
            "/tmp/run-01",
            "--blocks",
            "10",
        ])
        .expect("record args should parse");

        match cli.command {
            Command::Record(args) => {
                assert_eq!(args.blocks, Some(10));
                assert_eq!(args.listen.port(), 12345);
                assert_eq!(args.device_args.channels, 14);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn record_requires_exactly_one_source() {
        let err = Cli::try_parse_from(["acqsync", "record", "--serial", "SN20120229000459"])
            .expect_err("missing source should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from([
            "acqsync",
            "record",
            "--device",
            "/dev/hidraw0",
            "--replay",
            "/tmp/dump.bin",
            "--serial",
            "SN20120229000459",
        ])
        .expect_err("conflicting sources should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_mark_subcommand() {
        let cli = Cli::try_parse_from(["acqsync", "mark", "S1", "S2", "--addr", "127.0.0.1:9000"])
            .expect("mark args should parse");
        match cli.command {
            Command::Mark(args) => {
                assert_eq!(args.labels, vec!["S1", "S2"]);
                assert_eq!(args.addr.port(), 9000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_channel_count() {
        let err = Cli::try_parse_from([
            "acqsync",
            "decode",
            "/tmp/dump.bin",
            "--serial",
            "SN20120229000459",
            "--channels",
            "15",
        ])
        .expect_err("channel count above 14 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
