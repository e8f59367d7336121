//! Persistence for acquisition sessions.
//!
//! A session is stored as three files next to each other:
//! - `<base>.meta`: JSON metadata, written once at session start
//! - `<base>.eeg`: little-endian `f32` samples, row-major (sample × channel)
//! - `<base>.marker`: one `"<global sample index> <label>"` line per marker
//!
//! Marker lines are written block by block. Within a block they are sorted;
//! across blocks they follow write order.

pub mod error;
pub mod metadata;
pub mod sink;

pub use error::{Result, StoreError};
pub use metadata::SessionMetadata;
pub use sink::{SessionPaths, SessionSink};
