//! Acquisition sessions.
//!
//! An [`Acquisition`] drives any [`Amplifier`], runs a marker listener for the
//! duration of the session, merges network markers into each block and
//! optionally records everything to disk.
//!
//! ```no_run
//! use acqsync_session::{Acquisition, EpocAmplifier, EpocConfig, SessionConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let amp = EpocAmplifier::open("/dev/hidraw0", EpocConfig::new("SN20120229000459"))?;
//! let mut session = Acquisition::new(amp, SessionConfig::default());
//! session.start(Some("/tmp/run-01".as_ref()))?;
//! for _ in 0..128 {
//!     let block = session.poll()?;
//!     for marker in &block.markers {
//!         println!("{} {}", block.first_sample + marker.offset, marker.label);
//!     }
//! }
//! session.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod amplifier;
pub mod epoc;
pub mod error;

pub use acquisition::{Acquisition, MergedBlock, SessionConfig, SessionState};
pub use amplifier::Amplifier;
pub use epoc::{channel_names, EpocAmplifier, EpocConfig, ELECTRODES, SAMPLING_FREQUENCY};
pub use error::{DeviceError, Result, SessionError};
