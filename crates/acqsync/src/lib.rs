//! Biosignal acquisition with network marker synchronization.
//!
//! acqsync reads samples from an amplifier, accepts event markers from other
//! programs over TCP, places each marker on the sample it belongs to and
//! records samples, markers and metadata to disk.
//!
//! # Crate Structure
//!
//! - [`transport`] - Device streams and the marker TCP client
//! - [`frame`] - Encrypted frame decoding, sample blocks, message reassembly
//! - [`marker`] - Marker listener and sample-domain synchronization
//! - [`store`] - Session files on disk
//! - [`session`] - Amplifier trait and the acquisition orchestrator

/// Re-export transport types.
pub mod transport {
    pub use acqsync_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use acqsync_frame::*;
}

/// Re-export marker listener and synchronization types.
pub mod marker {
    pub use acqsync_marker::*;
}

/// Re-export persistence types.
pub mod store {
    pub use acqsync_store::*;
}

/// Re-export session types.
pub mod session {
    pub use acqsync_session::*;
}
