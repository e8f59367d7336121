//! Network markers for an acquisition session.
//!
//! A [`MarkerListener`] accepts TCP connections, reassembles newline-delimited
//! labels and stamps each with the wall-clock time it was received. The
//! [`Synchronizer`] later turns those timestamps into sample offsets relative
//! to the block being acquired and merges them with the device's own markers.

pub mod error;
pub mod listener;
pub mod marker;
pub mod queue;
pub mod sync;

pub use error::{MarkerError, Result};
pub use listener::{ListenerConfig, MarkerListener};
pub use marker::TimedMarker;
pub use queue::{MarkerQueue, MarkerSender};
pub use sync::{
    merge_block, BlockWindow, MergeMode, MergeOutcome, StaleMarker, Synchronizer,
    DEFAULT_SETTLE_DELAY,
};
