use crate::error::{FrameError, Result};

/// AES-128 key size in bytes.
pub const KEY_SIZE: usize = 16;

/// Minimum serial length: the schedule reads serial bytes 12 through 15.
const MIN_SERIAL_LEN: usize = 16;

/// Slot in the 16-byte key schedule: either a serial byte index or a constant.
#[derive(Clone, Copy)]
enum Slot {
    Serial(usize),
    Const(u8),
}

use Slot::{Const, Serial};

const RESEARCH_SCHEDULE: [Slot; KEY_SIZE] = [
    Serial(15),
    Const(0x00),
    Serial(14),
    Const(0x54),
    Serial(13),
    Const(0x10),
    Serial(12),
    Const(0x42),
    Serial(15),
    Const(0x00),
    Serial(14),
    Const(0x48),
    Serial(13),
    Const(0x00),
    Serial(12),
    Const(0x50),
];

const CONSUMER_SCHEDULE: [Slot; KEY_SIZE] = [
    Serial(15),
    Const(0x00),
    Serial(14),
    Const(0x48),
    Serial(13),
    Const(0x00),
    Serial(12),
    Const(0x54),
    Serial(15),
    Const(0x10),
    Serial(14),
    Const(0x42),
    Serial(13),
    Const(0x00),
    Serial(12),
    Const(0x50),
];

/// Hardware class of the amplifier. Each class uses its own key schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    #[default]
    Research,
    Consumer,
}

impl DeviceClass {
    fn schedule(self) -> &'static [Slot; KEY_SIZE] {
        match self {
            DeviceClass::Research => &RESEARCH_SCHEDULE,
            DeviceClass::Consumer => &CONSUMER_SCHEDULE,
        }
    }

    /// Human-readable class name.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Research => "research",
            DeviceClass::Consumer => "consumer",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the frame decryption key from the device serial number.
///
/// The serial is the USB serial string as raw bytes; only bytes 12..=15 enter
/// the key, interleaved with class-specific constants.
pub fn derive_key(serial: &[u8], class: DeviceClass) -> Result<[u8; KEY_SIZE]> {
    if serial.len() < MIN_SERIAL_LEN {
        return Err(FrameError::SerialTooShort {
            len: serial.len(),
            min: MIN_SERIAL_LEN,
        });
    }

    let mut key = [0u8; KEY_SIZE];
    for (dst, slot) in key.iter_mut().zip(class.schedule()) {
        *dst = match *slot {
            Serial(index) => serial[index],
            Const(value) => value,
        };
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIAL: &[u8] = b"SN20120229000459";

    #[test]
    fn research_key_layout() {
        let key = derive_key(SERIAL, DeviceClass::Research).unwrap();
        // Bytes 12..=15 of the serial are b"0459".
        assert_eq!(
            key,
            [
                b'9', 0x00, b'5', 0x54, b'4', 0x10, b'0', 0x42, b'9', 0x00, b'5', 0x48, b'4',
                0x00, b'0', 0x50
            ]
        );
    }

    #[test]
    fn consumer_key_layout() {
        let key = derive_key(SERIAL, DeviceClass::Consumer).unwrap();
        assert_eq!(
            key,
            [
                b'9', 0x00, b'5', 0x48, b'4', 0x00, b'0', 0x54, b'9', 0x10, b'5', 0x42, b'4',
                0x00, b'0', 0x50
            ]
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        for class in [DeviceClass::Research, DeviceClass::Consumer] {
            let first = derive_key(SERIAL, class).unwrap();
            let second = derive_key(SERIAL, class).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn classes_never_share_a_key() {
        let serials: [&[u8]; 4] = [
            SERIAL,
            &[0u8; 16],
            &[0xFF; 16],
            b"0000000000000000extra",
        ];
        for serial in serials {
            let research = derive_key(serial, DeviceClass::Research).unwrap();
            let consumer = derive_key(serial, DeviceClass::Consumer).unwrap();
            assert_ne!(research, consumer);
        }
    }

    #[test]
    fn only_trailing_serial_bytes_matter() {
        let a = derive_key(b"AAAAAAAAAAAA1234", DeviceClass::Research).unwrap();
        let b = derive_key(b"BBBBBBBBBBBB1234", DeviceClass::Research).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn short_serial_is_rejected() {
        let err = derive_key(b"SN123", DeviceClass::Research).unwrap_err();
        assert!(matches!(err, FrameError::SerialTooShort { len: 5, min: 16 }));
    }
}
