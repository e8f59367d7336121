use serde::{Deserialize, Serialize};

/// Session description written once when recording starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Channel names in sample-row order.
    #[serde(rename = "Channels")]
    pub channels: Vec<String>,
    /// Sampling frequency in Hz.
    #[serde(rename = "Sampling Frequency")]
    pub sampling_frequency: f64,
    /// Identity of the amplifier that produced the samples.
    #[serde(rename = "Amp")]
    pub amplifier: String,
}

impl SessionMetadata {
    pub fn new(
        channels: Vec<String>,
        sampling_frequency: f64,
        amplifier: impl Into<String>,
    ) -> Self {
        Self {
            channels,
            sampling_frequency,
            amplifier: amplifier.into(),
        }
    }
}
