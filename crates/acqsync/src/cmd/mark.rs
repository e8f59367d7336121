use std::time::Duration;

use acqsync_transport::MarkerClient;
use tracing::info;

use crate::cmd::{parse_duration, parse_timeout, MarkArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: MarkArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let interval = args
        .interval
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .unwrap_or(Duration::ZERO);

    let mut client = MarkerClient::connect_timeout(args.addr, timeout)
        .map_err(|err| transport_error("connect failed", err))?;

    if interval.is_zero() {
        client
            .send_batch(&args.labels)
            .map_err(|err| transport_error("send failed", err))?;
    } else {
        for (i, label) in args.labels.iter().enumerate() {
            if i > 0 {
                std::thread::sleep(interval);
            }
            client
                .send(label)
                .map_err(|err| transport_error("send failed", err))?;
        }
    }

    info!(addr = %args.addr, count = args.labels.len(), "markers sent");
    print_sent(&args.addr.to_string(), args.labels.len(), format);
    Ok(SUCCESS)
}
