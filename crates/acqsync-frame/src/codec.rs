use tracing::{debug, trace};

use crate::cipher::FrameCipher;
use crate::error::Result;
use crate::key::DeviceClass;

/// Wire size of one amplifier frame.
pub const FRAME_SIZE: usize = 32;

/// Size of one independently encrypted half.
pub const HALF_SIZE: usize = FRAME_SIZE / 2;

/// Number of 14-bit raw channel fields per frame.
pub const RAW_CHANNELS: usize = 16;

/// Number of gyroscope axes per frame.
pub const GYRO_AXES: usize = 2;

/// Counter value reported for frames that carry the battery level.
pub const BATTERY_COUNTER: u8 = 128;

const BATTERY_FLAG: u32 = 0x80;
const SEVEN_BITS: u32 = 0x7f;
const RAW_BITS: usize = 14;
const GYRO_BITS: usize = 8;
const GYRO_BIAS: i16 = 100;
const QUALITY_CYCLE: u8 = 64;

/// Decoder-local state carried across frames.
///
/// Battery and contact quality are multiplexed over the counter byte, so each
/// frame only refreshes a part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    battery: u8,
    quality: Vec<u8>,
}

impl DeviceState {
    /// Fresh state for a device with `channel_count` electrodes.
    pub fn new(channel_count: usize) -> Self {
        Self {
            battery: 0,
            quality: vec![0; channel_count],
        }
    }

    /// Last reported battery level.
    pub fn battery(&self) -> u8 {
        self.battery
    }

    /// Last reported contact quality per electrode.
    pub fn quality(&self) -> &[u8] {
        &self.quality
    }

    /// Number of electrodes tracked.
    pub fn channel_count(&self) -> usize {
        self.quality.len()
    }
}

/// Fields extracted from one decrypted frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// Frame counter (0..=127), or [`BATTERY_COUNTER`] for battery frames.
    pub counter: u8,
    /// Battery level as known after this frame.
    pub battery: u8,
    /// Raw 14-bit channel values in wire order.
    pub raw: [u16; RAW_CHANNELS],
    /// Gyroscope readings.
    pub gyro: [i16; GYRO_AXES],
    /// Snapshot of the quality array after this frame.
    pub quality: Vec<u8>,
}

impl DecodedFrame {
    /// Whether this frame carried the battery level instead of a counter.
    pub fn reports_battery(&self) -> bool {
        self.counter == BATTERY_COUNTER
    }

    /// Flatten into one sample row:
    /// `counter, battery, raw × 16, gyro × 2, quality × channel_count`.
    pub fn sample_vector(&self) -> Vec<f32> {
        let mut row = Vec::with_capacity(2 + RAW_CHANNELS + GYRO_AXES + self.quality.len());
        row.push(f32::from(self.counter));
        row.push(f32::from(self.battery));
        row.extend(self.raw.iter().map(|&v| f32::from(v)));
        row.extend(self.gyro.iter().map(|&v| f32::from(v)));
        row.extend(self.quality.iter().map(|&v| f32::from(v)));
        row
    }
}

/// Number of values in a sample row for `channel_count` electrodes.
pub fn sample_width(channel_count: usize) -> usize {
    2 + RAW_CHANNELS + GYRO_AXES + channel_count
}

/// Reads fixed-width fields MSB-first from a decrypted frame.
struct BitCursor<'a> {
    bytes: &'a [u8; FRAME_SIZE],
    pos: usize,
}

impl<'a> BitCursor<'a> {
    fn new(bytes: &'a [u8; FRAME_SIZE]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, bits: usize) -> u32 {
        debug_assert!(bits <= 32 && self.pos + bits <= FRAME_SIZE * 8);
        let mut value = 0u32;
        for _ in 0..bits {
            let byte = self.bytes[self.pos / 8];
            let bit = (byte >> (7 - self.pos % 8)) & 1;
            value = (value << 1) | u32::from(bit);
            self.pos += 1;
        }
        value
    }
}

/// Stateful decoder for one physical device.
#[derive(Debug, Clone)]
pub struct Decoder {
    cipher: FrameCipher,
    state: DeviceState,
}

impl Decoder {
    /// Create a decoder with an explicit cipher.
    pub fn new(cipher: FrameCipher, channel_count: usize) -> Self {
        Self {
            cipher,
            state: DeviceState::new(channel_count),
        }
    }

    /// Create a decoder for a device serial number and class.
    pub fn for_device(serial: &[u8], class: DeviceClass, channel_count: usize) -> Result<Self> {
        Ok(Self::new(
            FrameCipher::for_device(serial, class)?,
            channel_count,
        ))
    }

    /// Decrypt and decode one encrypted frame.
    pub fn decode(&mut self, frame: &[u8]) -> Result<DecodedFrame> {
        let plain = self.cipher.decrypt_frame(frame)?;
        Ok(self.decode_plain(&plain))
    }

    /// Decode an already decrypted frame, updating device state.
    pub fn decode_plain(&mut self, plain: &[u8; FRAME_SIZE]) -> DecodedFrame {
        let mut bits = BitCursor::new(plain);

        let head = bits.take(8);
        let counter = if head & BATTERY_FLAG != 0 {
            self.state.battery = (head & SEVEN_BITS) as u8;
            debug!(battery = self.state.battery, "battery level reported");
            BATTERY_COUNTER
        } else {
            (head & SEVEN_BITS) as u8
        };

        let mut raw = [0u16; RAW_CHANNELS];
        for value in raw.iter_mut() {
            *value = bits.take(RAW_BITS) as u16;
        }

        let mut gyro = [0i16; GYRO_AXES];
        for value in gyro.iter_mut() {
            let byte = bits.take(GYRO_BITS);
            let magnitude = (byte & SEVEN_BITS) as i16 - GYRO_BIAS;
            *value = if byte & BATTERY_FLAG != 0 {
                -magnitude
            } else {
                magnitude
            };
        }

        // The quality byte belongs to electrode `counter % 64`. Counters
        // 64..=127 wrap onto the same electrodes as 0..=63.
        let quality = bits.take(8) as u8;
        if counter < BATTERY_COUNTER {
            let index = usize::from(counter % QUALITY_CYCLE);
            if index < self.state.quality.len() {
                self.state.quality[index] = quality;
            }
        }
        trace!(counter, "decoded frame");

        DecodedFrame {
            counter,
            battery: self.state.battery,
            raw,
            gyro,
            quality: self.state.quality.clone(),
        }
    }

    /// Current device state.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Number of electrodes tracked by this decoder.
    pub fn channel_count(&self) -> usize {
        self.state.channel_count()
    }
}
