/// Errors that can occur while reading or decoding amplifier frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame does not have the fixed wire size.
    #[error("invalid frame length ({len} bytes, expected {expected})")]
    InvalidLength { len: usize, expected: usize },

    /// The device serial number is too short to derive a key from.
    #[error("serial number too short ({len} bytes, need at least {min})")]
    SerialTooShort { len: usize, min: usize },

    /// A sample row does not match the block's channel count.
    #[error("sample row has {got} values, block has {expected} channels")]
    RowWidth { got: usize, expected: usize },

    /// An I/O error occurred while reading frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source ended in the middle of a frame.
    #[error("source closed mid-frame ({got} of {expected} bytes)")]
    Truncated { got: usize, expected: usize },

    /// The source ended cleanly between frames.
    #[error("frame source closed")]
    SourceClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
