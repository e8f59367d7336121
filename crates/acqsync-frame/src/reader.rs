use std::io::{ErrorKind, Read};

use crate::codec::FRAME_SIZE;
use crate::error::{FrameError, Result};

/// Reads fixed-size frames from any `Read` source.
///
/// Short reads are retried internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    frames_read: u64,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            frames_read: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::SourceClosed)` when EOF is reached on a frame
    /// boundary and `Err(FrameError::Truncated)` when it is reached mid-frame.
    pub fn read_frame(&mut self) -> Result<[u8; FRAME_SIZE]> {
        let mut frame = [0u8; FRAME_SIZE];
        let mut filled = 0usize;

        while filled < FRAME_SIZE {
            match self.inner.read(&mut frame[filled..]) {
                Ok(0) if filled == 0 => return Err(FrameError::SourceClosed),
                Ok(0) => {
                    return Err(FrameError::Truncated {
                        got: filled,
                        expected: FRAME_SIZE,
                    })
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.frames_read += 1;
        Ok(frame)
    }

    /// Number of complete frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Debug for FrameReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("frames_read", &self.frames_read)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn numbered_frames(count: u8) -> Vec<u8> {
        (0..count)
            .flat_map(|i| std::iter::repeat(i).take(FRAME_SIZE))
            .collect()
    }

    #[test]
    fn reads_consecutive_frames() {
        let mut reader = FrameReader::new(Cursor::new(numbered_frames(3)));

        for i in 0..3u8 {
            let frame = reader.read_frame().unwrap();
            assert!(frame.iter().all(|&b| b == i));
        }
        assert_eq!(reader.frames_read(), 3);
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::SourceClosed
        ));
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: numbered_frames(2),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        assert_eq!(reader.read_frame().unwrap(), [0u8; FRAME_SIZE]);
        assert_eq!(reader.read_frame().unwrap(), [1u8; FRAME_SIZE]);
    }

    #[test]
    fn closed_mid_frame_is_truncated() {
        let mut bytes = numbered_frames(1);
        bytes.extend_from_slice(&[9u8; 10]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        reader.read_frame().unwrap();
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                got: 10,
                expected: FRAME_SIZE
            }
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            bytes: numbered_frames(1),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_frame().unwrap(), [0u8; FRAME_SIZE]);
    }

    #[test]
    fn other_io_errors_propagate() {
        let mut reader = FrameReader::new(FailingReader);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }
}
