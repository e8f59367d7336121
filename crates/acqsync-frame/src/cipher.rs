use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::codec::{FRAME_SIZE, HALF_SIZE};
use crate::error::{FrameError, Result};
use crate::key::{derive_key, DeviceClass, KEY_SIZE};

/// Block cipher for amplifier frames.
///
/// Each 16-byte half of a frame is one AES-128 block, encrypted on its own
/// (ECB, no chaining between halves).
#[derive(Clone)]
pub struct FrameCipher {
    cipher: Aes128,
}

impl FrameCipher {
    /// Build a cipher from a raw key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(key)),
        }
    }

    /// Build a cipher for a device serial number and class.
    pub fn for_device(serial: &[u8], class: DeviceClass) -> Result<Self> {
        Ok(Self::new(&derive_key(serial, class)?))
    }

    /// Decrypt one half of a frame.
    pub fn decrypt_half(&self, half: &[u8; HALF_SIZE]) -> [u8; HALF_SIZE] {
        let mut block = GenericArray::clone_from_slice(half);
        self.cipher.decrypt_block(&mut block);
        let mut out = [0u8; HALF_SIZE];
        out.copy_from_slice(&block);
        out
    }

    /// Encrypt one half of a frame.
    pub fn encrypt_half(&self, half: &[u8; HALF_SIZE]) -> [u8; HALF_SIZE] {
        let mut block = GenericArray::clone_from_slice(half);
        self.cipher.encrypt_block(&mut block);
        let mut out = [0u8; HALF_SIZE];
        out.copy_from_slice(&block);
        out
    }

    /// Decrypt a full frame: both halves independently, concatenated in order.
    pub fn decrypt_frame(&self, frame: &[u8]) -> Result<[u8; FRAME_SIZE]> {
        self.transform(frame, Self::decrypt_half)
    }

    /// Encrypt a full plaintext frame. Used to produce replay dumps.
    pub fn encrypt_frame(&self, frame: &[u8]) -> Result<[u8; FRAME_SIZE]> {
        self.transform(frame, Self::encrypt_half)
    }

    fn transform(
        &self,
        frame: &[u8],
        op: fn(&Self, &[u8; HALF_SIZE]) -> [u8; HALF_SIZE],
    ) -> Result<[u8; FRAME_SIZE]> {
        let frame: &[u8; FRAME_SIZE] = frame.try_into().map_err(|_| FrameError::InvalidLength {
            len: frame.len(),
            expected: FRAME_SIZE,
        })?;

        let mut out = [0u8; FRAME_SIZE];
        for (src, dst) in frame
            .chunks_exact(HALF_SIZE)
            .zip(out.chunks_exact_mut(HALF_SIZE))
        {
            let mut half = [0u8; HALF_SIZE];
            half.copy_from_slice(src);
            dst.copy_from_slice(&op(self, &half));
        }
        Ok(out)
    }
}

impl std::fmt::Debug for FrameCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCipher")
            .field("algorithm", &"aes-128-ecb")
            .field("key", &format_args!("<redacted>"))
            .finish()
    }
}
