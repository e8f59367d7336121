use acqsync_frame::SampleBlock;

use crate::error::DeviceError;

/// A source of sample blocks.
///
/// Implementations report device markers through [`SampleBlock::push_marker`]
/// with offsets relative to the block's first row.
pub trait Amplifier {
    /// Device-specific settings accepted by [`Amplifier::configure`].
    type Config;

    /// Human-readable identity, recorded in session metadata.
    fn name(&self) -> &str;

    fn start(&mut self) -> Result<(), DeviceError>;

    fn stop(&mut self) -> Result<(), DeviceError>;

    fn configure(&mut self, config: Self::Config) -> Result<(), DeviceError>;

    /// Block until the next block of samples is available.
    fn get_data(&mut self) -> Result<SampleBlock, DeviceError>;

    /// Channel names in sample-row order.
    fn channels(&self) -> Vec<String>;

    /// Sampling frequency in Hz.
    fn sampling_frequency(&self) -> f64;
}
