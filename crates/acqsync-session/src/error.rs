use crate::acquisition::SessionState;

/// Errors raised by amplifier implementations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The device could not be opened or read.
    #[error("transport error: {0}")]
    Transport(#[from] acqsync_transport::TransportError),

    /// A frame could not be read or decoded.
    #[error("frame error: {0}")]
    Frame(#[from] acqsync_frame::FrameError),

    /// The amplifier configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Data was requested from an amplifier that is not started.
    #[error("amplifier is not running")]
    NotRunning,
}

/// Errors that can occur while running an acquisition session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation is not valid in the session's current state.
    #[error("cannot {operation} a session that is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The amplifier failed.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// The marker listener failed.
    #[error("marker listener error: {0}")]
    Marker(#[from] acqsync_marker::MarkerError),

    /// The session files could not be written.
    #[error("store error: {0}")]
    Store(#[from] acqsync_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
