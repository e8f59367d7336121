use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use acqsync_frame::FrameError;
use acqsync_marker::ListenerConfig;
use acqsync_session::{
    Acquisition, Amplifier, DeviceError, EpocAmplifier, EpocConfig, SessionConfig, SessionError,
};
use acqsync_transport::DeviceStream;
use tracing::info;

use crate::cmd::{parse_duration, RecordArgs};
use crate::exit::{device_error, session_error, CliError, CliResult, SUCCESS};
use crate::output::{
    print_marker, print_summary, print_timed_marker, OutputFormat, RecordSummary,
};

pub fn run(args: RecordArgs, format: OutputFormat) -> CliResult<i32> {
    let settle_delay = parse_duration(&args.settle_delay)?;
    let amp = open_amplifier(&args).map_err(|err| device_error("open failed", err))?;

    let span = tracing::info_span!("session", amp = %amp.name());
    let config = SessionConfig {
        listener: ListenerConfig {
            addr: args.listen,
            ..ListenerConfig::default()
        },
        settle_delay,
        debug_network_only: args.debug_network_only,
        span,
    };
    let mut session = Acquisition::new(amp, config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    session
        .start(args.save.as_deref())
        .map_err(|err| session_error("start failed", err))?;

    let recorded = record_until_stopped(&mut session, &args, &running, format);
    let stopped = session
        .stop()
        .map_err(|err| session_error("stop failed", err));

    let summary = recorded?;
    stopped?;
    print_summary(&summary, format);
    Ok(SUCCESS)
}

fn open_amplifier(args: &RecordArgs) -> Result<EpocAmplifier<DeviceStream>, DeviceError> {
    let config = EpocConfig {
        serial: args.device_args.serial.clone(),
        class: args.device_args.class.into(),
        channel_count: usize::from(args.device_args.channels),
    };
    match (&args.device, &args.replay) {
        (Some(path), _) => EpocAmplifier::open(path, config),
        (None, Some(path)) => EpocAmplifier::replay(path, config),
        (None, None) => Err(DeviceError::Config(
            "either --device or --replay is required".to_string(),
        )),
    }
}

fn record_until_stopped(
    session: &mut Acquisition<EpocAmplifier<DeviceStream>>,
    args: &RecordArgs,
    running: &AtomicBool,
    format: OutputFormat,
) -> CliResult<RecordSummary> {
    let mut summary = RecordSummary::default();

    while running.load(Ordering::SeqCst) {
        if args.blocks.is_some_and(|limit| summary.blocks >= limit) {
            break;
        }

        let block = match session.poll() {
            Ok(block) => block,
            Err(SessionError::Device(DeviceError::Frame(FrameError::SourceClosed))) => {
                info!("device stream ended");
                break;
            }
            Err(err) => return Err(session_error("acquisition failed", err)),
        };

        summary.blocks += 1;
        summary.samples += block.samples.len() as u64;
        summary.stale_markers += block.stale.len() as u64;
        for (index, marker) in block.markers.iter().enumerate() {
            print_marker(
                block.first_sample + marker.offset,
                &marker.label,
                block.is_stale(index),
                format,
            );
            summary.markers += 1;
        }
        for marker in &block.network_timestamps {
            print_timed_marker(block.first_sample, &marker.label, marker.timestamp, format);
            summary.markers += 1;
        }
    }

    info!(
        blocks = summary.blocks,
        samples = summary.samples,
        markers = summary.markers,
        "recording finished"
    );
    Ok(summary)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{ClassArg, DeviceArgs};
    use crate::exit::USAGE;

    fn args(device: Option<&str>, replay: Option<&str>) -> RecordArgs {
        RecordArgs {
            device: device.map(Into::into),
            replay: replay.map(Into::into),
            device_args: DeviceArgs {
                serial: "SN20120229000459".to_string(),
                class: ClassArg::Research,
                channels: 14,
            },
            listen: "127.0.0.1:0".parse().unwrap(),
            save: None,
            blocks: None,
            settle_delay: "0us".to_string(),
            debug_network_only: false,
        }
    }

    #[test]
    fn missing_source_is_a_config_error() {
        assert!(matches!(
            open_amplifier(&args(None, None)),
            Err(DeviceError::Config(_))
        ));
        let err = device_error("open failed", DeviceError::Config("x".into()));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn missing_replay_file_fails_to_open() {
        let err = open_amplifier(&args(None, Some("/nonexistent/acqsync/dump.bin"))).unwrap_err();
        assert!(matches!(err, DeviceError::Transport(_)));
    }
}
