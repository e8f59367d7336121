use std::fmt;
use std::io;

use acqsync_frame::FrameError;
use acqsync_marker::MarkerError;
use acqsync_session::{DeviceError, SessionError};
use acqsync_store::StoreError;
use acqsync_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Open { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidLabel(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::SerialTooShort { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::InvalidLength { .. }
        | FrameError::Truncated { .. }
        | FrameError::RowWidth { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::SourceClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    match err {
        DeviceError::Transport(err) => transport_error(context, err),
        DeviceError::Frame(err) => frame_error(context, err),
        DeviceError::Config(_) => CliError::new(USAGE, format!("{context}: {err}")),
        DeviceError::NotRunning => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn marker_error(context: &str, err: MarkerError) -> CliError {
    match err {
        MarkerError::Transport(err) => transport_error(context, err),
        MarkerError::ReadyTimeout(_) | MarkerError::JoinTimeout(_) => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn store_error(context: &str, err: StoreError) -> CliError {
    match err {
        StoreError::AlreadyExists { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        StoreError::Create { source, .. } | StoreError::Io(source) => io_error(context, source),
        StoreError::Json(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Device(err) => device_error(context, err),
        SessionError::Marker(err) => marker_error(context, err),
        SessionError::Store(err) => store_error(context, err),
        SessionError::InvalidState { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
