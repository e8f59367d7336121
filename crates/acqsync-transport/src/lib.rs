//! Byte-level transports for acqsync.
//!
//! Two directions live here:
//! - device streams: the raw byte source an amplifier driver reads frames from
//!   (a device node such as hidraw, or a recorded dump for replay)
//! - the marker client: a TCP connection that delivers newline-delimited
//!   marker labels to a running marker listener
//!
//! This is the lowest layer of acqsync. Frame decoding and marker handling
//! build on top of it.

pub mod device;
pub mod error;
pub mod tcp;

pub use device::DeviceStream;
pub use error::{Result, TransportError};
pub use tcp::{default_marker_addr, MarkerClient, DEFAULT_MARKER_PORT, MARKER_DELIMITER};
