use std::io::Read;
use std::path::Path;

use acqsync_frame::{sample_width, Decoder, DeviceClass, FrameReader, SampleBlock};
use acqsync_transport::DeviceStream;
use tracing::{debug, info, trace};

use crate::amplifier::Amplifier;
use crate::error::DeviceError;

/// Nominal sampling frequency of the headset in Hz.
pub const SAMPLING_FREQUENCY: f64 = 128.0;

/// Electrode names in the order their contact quality is reported.
pub const ELECTRODES: [&str; 14] = [
    "AF3", "F7", "F3", "FC5", "T7", "P7", "O1", "O2", "P8", "T8", "FC6", "F4", "F8", "AF4",
];

// Raw fields on the wire: 7 electrodes, 2 unidentified, 7 electrodes.
const RAW_NAMES: [&str; 16] = [
    "AF3", "F7", "F3", "FC5", "T7", "P7", "O1", "UNKNOWN_1", "UNKNOWN_2", "O2", "P8", "T8", "FC6",
    "F4", "F8", "AF4",
];

/// Settings for [`EpocAmplifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpocConfig {
    /// Device serial number; at least 16 bytes.
    pub serial: String,
    pub class: DeviceClass,
    /// Electrodes tracked for contact quality.
    pub channel_count: usize,
}

impl EpocConfig {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            class: DeviceClass::default(),
            channel_count: ELECTRODES.len(),
        }
    }

    pub fn with_class(mut self, class: DeviceClass) -> Self {
        self.class = class;
        self
    }
}

/// Channel names of a sample row for `channel_count` tracked electrodes.
pub fn channel_names(channel_count: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(sample_width(channel_count));
    names.push("COUNTER".to_string());
    names.push("BATTERY".to_string());
    names.extend(RAW_NAMES.iter().map(|name| name.to_string()));
    names.push("GYRO_X".to_string());
    names.push("GYRO_Y".to_string());
    names.extend(
        ELECTRODES
            .iter()
            .take(channel_count)
            .map(|name| format!("Q_{name}")),
    );
    names
}

/// Encrypted-frame headset read from any byte source.
///
/// Every [`Amplifier::get_data`] call reads exactly one frame and returns a
/// one-row block. The headset carries no device markers.
pub struct EpocAmplifier<R> {
    reader: FrameReader<R>,
    decoder: Decoder,
    config: EpocConfig,
    name: String,
    running: bool,
}

impl<R: Read> EpocAmplifier<R> {
    pub fn new(source: R, config: EpocConfig) -> Result<Self, DeviceError> {
        let decoder = build_decoder(&config)?;
        let name = display_name(&config);
        Ok(Self {
            reader: FrameReader::new(source),
            decoder,
            config,
            name,
            running: false,
        })
    }

    pub fn config(&self) -> &EpocConfig {
        &self.config
    }

    /// Frames read since the amplifier was created.
    pub fn frames_read(&self) -> u64 {
        self.reader.frames_read()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl EpocAmplifier<DeviceStream> {
    /// Read from a device node such as `/dev/hidraw0`.
    pub fn open(path: impl AsRef<Path>, config: EpocConfig) -> Result<Self, DeviceError> {
        Self::new(DeviceStream::open(path)?, config)
    }

    /// Read frames from a recorded dump.
    pub fn replay(path: impl AsRef<Path>, config: EpocConfig) -> Result<Self, DeviceError> {
        Self::new(DeviceStream::replay(path)?, config)
    }
}

impl<R: Read> Amplifier for EpocAmplifier<R> {
    type Config = EpocConfig;

    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        self.running = true;
        info!(amp = %self.name, "amplifier started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.running = false;
        info!(amp = %self.name, frames = self.reader.frames_read(), "amplifier stopped");
        Ok(())
    }

    /// Replace the serial, class or channel count. Decoder state (battery,
    /// contact quality) starts over.
    fn configure(&mut self, config: EpocConfig) -> Result<(), DeviceError> {
        self.decoder = build_decoder(&config)?;
        self.name = display_name(&config);
        self.config = config;
        debug!(amp = %self.name, "amplifier reconfigured");
        Ok(())
    }

    fn get_data(&mut self) -> Result<SampleBlock, DeviceError> {
        if !self.running {
            return Err(DeviceError::NotRunning);
        }
        let frame = self.reader.read_frame()?;
        let decoded = self.decoder.decode(&frame)?;
        trace!(counter = decoded.counter, battery = decoded.battery, "frame decoded");
        Ok(SampleBlock::from_row(decoded.sample_vector()))
    }

    fn channels(&self) -> Vec<String> {
        channel_names(self.config.channel_count)
    }

    fn sampling_frequency(&self) -> f64 {
        SAMPLING_FREQUENCY
    }
}

impl<R> std::fmt::Debug for EpocAmplifier<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpocAmplifier")
            .field("name", &self.name)
            .field("channel_count", &self.config.channel_count)
            .field("running", &self.running)
            .finish()
    }
}

fn build_decoder(config: &EpocConfig) -> Result<Decoder, DeviceError> {
    if config.channel_count == 0 || config.channel_count > ELECTRODES.len() {
        return Err(DeviceError::Config(format!(
            "channel count must be between 1 and {}, got {}",
            ELECTRODES.len(),
            config.channel_count
        )));
    }
    Ok(Decoder::for_device(
        config.serial.as_bytes(),
        config.class,
        config.channel_count,
    )?)
}

fn display_name(config: &EpocConfig) -> String {
    format!("Emotiv EPOC ({})", config.class)
}

#[cfg(test)]
mod tests {
    use acqsync_frame::{FrameCipher, FrameError, FRAME_SIZE};

    use super::*;

    const SERIAL: &str = "SN20120229000459";

    /// Plain frame with the given counter byte and everything else zero.
    fn plain_frame(counter_byte: u8, quality: u8) -> [u8; FRAME_SIZE] {
        let mut frame = [0u8; FRAME_SIZE];
        frame[0] = counter_byte;
        frame[FRAME_SIZE - 1] = quality;
        frame
    }

    fn encrypted_stream(frames: &[[u8; FRAME_SIZE]]) -> Vec<u8> {
        let cipher = FrameCipher::for_device(SERIAL.as_bytes(), DeviceClass::Research).unwrap();
        frames
            .iter()
            .flat_map(|frame| cipher.encrypt_frame(frame).unwrap())
            .collect()
    }

    fn started(bytes: Vec<u8>) -> EpocAmplifier<DeviceStream> {
        let mut amp =
            EpocAmplifier::new(DeviceStream::from_bytes(bytes), EpocConfig::new(SERIAL)).unwrap();
        amp.start().unwrap();
        amp
    }

    #[test]
    fn channel_names_match_row_layout() {
        let names = channel_names(14);
        assert_eq!(names.len(), sample_width(14));
        assert_eq!(names[0], "COUNTER");
        assert_eq!(names[1], "BATTERY");
        assert_eq!(names[2], "AF3");
        assert_eq!(names[9], "UNKNOWN_1");
        assert_eq!(names[10], "UNKNOWN_2");
        assert_eq!(names[17], "AF4");
        assert_eq!(names[18], "GYRO_X");
        assert_eq!(names[19], "GYRO_Y");
        assert_eq!(names[20], "Q_AF3");
        assert_eq!(names[33], "Q_AF4");
    }

    #[test]
    fn each_poll_returns_one_decoded_row() {
        let mut amp = started(encrypted_stream(&[
            plain_frame(0x00, 7),
            plain_frame(0x80 | 42, 0),
        ]));

        let first = amp.get_data().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first.channels(), amp.channels().len());
        assert!(first.markers().is_empty());
        assert_eq!(first.data()[0], 0.0);
        assert_eq!(first.data()[20], 7.0);

        let second = amp.get_data().unwrap();
        assert_eq!(second.data()[0], 128.0);
        assert_eq!(second.data()[1], 42.0);
        // Quality persists across frames.
        assert_eq!(second.data()[20], 7.0);
        assert_eq!(amp.frames_read(), 2);
    }

    #[test]
    fn end_of_stream_is_a_frame_error() {
        let mut amp = started(encrypted_stream(&[plain_frame(1, 0)]));
        amp.get_data().unwrap();
        assert!(matches!(
            amp.get_data(),
            Err(DeviceError::Frame(FrameError::SourceClosed))
        ));
    }

    #[test]
    fn get_data_requires_start() {
        let mut amp = EpocAmplifier::new(
            DeviceStream::from_bytes(encrypted_stream(&[plain_frame(1, 0)])),
            EpocConfig::new(SERIAL),
        )
        .unwrap();
        assert!(matches!(amp.get_data(), Err(DeviceError::NotRunning)));
    }

    #[test]
    fn short_serial_is_rejected() {
        let err = EpocAmplifier::new(DeviceStream::from_bytes(Vec::new()), EpocConfig::new("SN123"))
            .unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Frame(FrameError::SerialTooShort { .. })
        ));
    }

    #[test]
    fn configure_validates_channel_count() {
        let mut amp =
            EpocAmplifier::new(DeviceStream::from_bytes(Vec::new()), EpocConfig::new(SERIAL))
                .unwrap();
        let mut config = EpocConfig::new(SERIAL);
        config.channel_count = 15;
        assert!(matches!(amp.configure(config), Err(DeviceError::Config(_))));

        let config = EpocConfig::new(SERIAL).with_class(DeviceClass::Consumer);
        amp.configure(config).unwrap();
        assert_eq!(amp.name(), "Emotiv EPOC (consumer)");
        assert_eq!(amp.sampling_frequency(), SAMPLING_FREQUENCY);
    }
}
