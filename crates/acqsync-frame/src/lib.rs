//! Frame decoding for the reference amplifier and marker message reassembly.
//!
//! The reference amplifier delivers 32-byte frames made of two independently
//! AES-128 encrypted halves. After decryption the frame is read as one
//! 256-bit big-endian integer:
//!
//! ```text
//! ┌───────────────┬──────────────────┬──────────────┬─────────────┐
//! │ counter/batt  │ 16 × raw channel │ 2 × gyro     │ quality     │
//! │ 8 bit         │ 14 bit each      │ 8 bit each   │ 8 bit       │
//! └───────────────┴──────────────────┴──────────────┴─────────────┘
//! ```
//!
//! Battery level and per-electrode contact quality are not part of every
//! frame, so the [`Decoder`] keeps them as [`DeviceState`] between calls.

pub mod block;
pub mod cipher;
pub mod codec;
pub mod delimited;
pub mod error;
pub mod key;
pub mod reader;

pub use block::{Marker, SampleBlock};
pub use cipher::FrameCipher;
pub use codec::{
    sample_width, DecodedFrame, Decoder, DeviceState, BATTERY_COUNTER, FRAME_SIZE, GYRO_AXES,
    HALF_SIZE, RAW_CHANNELS,
};
pub use delimited::MessageAssembler;
pub use error::{FrameError, Result};
pub use key::{derive_key, DeviceClass, KEY_SIZE};
pub use reader::FrameReader;
