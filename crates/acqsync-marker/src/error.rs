use std::time::Duration;

/// Errors that can occur while running the marker listener.
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    /// Transport-level error (bind, accept, I/O).
    #[error("transport error: {0}")]
    Transport(#[from] acqsync_transport::TransportError),

    /// The listener thread could not be spawned.
    #[error("failed to spawn listener thread: {0}")]
    Spawn(std::io::Error),

    /// The listener's async runtime could not be built.
    #[error("failed to build listener runtime: {0}")]
    Runtime(std::io::Error),

    /// The listener did not signal readiness in time.
    #[error("listener not ready after {0:?}")]
    ReadyTimeout(Duration),

    /// The listener exited before signalling readiness.
    #[error("listener exited before becoming ready")]
    ListenerExited,

    /// The listener did not exit in time after being stopped.
    #[error("listener did not stop within {0:?}")]
    JoinTimeout(Duration),

    /// The listener thread panicked.
    #[error("listener thread panicked")]
    ListenerPanicked,

    /// The consuming side of the marker queue is gone.
    #[error("marker queue closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, MarkerError>;
