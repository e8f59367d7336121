use std::io::IsTerminal;

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Shape of the stderr log lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One line per event, prefixed with the enclosing session span.
    Text,
    /// Shorter lines with span fields appended at the end.
    Compact,
    /// Newline-delimited JSON with the current span as an object.
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// At debug and above, closing a session span logs its busy and idle time.
fn span_events(level: LogLevel) -> FmtSpan {
    match level {
        LogLevel::Debug | LogLevel::Trace => FmtSpan::CLOSE,
        _ => FmtSpan::NONE,
    }
}

/// Install the stderr subscriber.
///
/// Thread names are included so listener events (thread `marker-listener`)
/// stand apart from the acquisition loop. Colors are only used for text
/// output on a terminal.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let ansi = format != LogFormat::Json && std::io::stderr().is_terminal();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::from(level))
        .with_ansi(ansi)
        .with_target(false)
        .with_thread_names(true)
        .with_span_events(span_events(level));

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .try_init(),
    };
    if let Err(err) = installed {
        eprintln!("warning: logging disabled: {err}");
    }
}
