use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};

/// A readable byte source carrying raw amplifier frames.
///
/// Device enumeration and kernel driver detachment happen outside acqsync;
/// this type only reads from something that is already accessible, such as a
/// hidraw node or a dump recorded from one.
pub struct DeviceStream {
    inner: DeviceStreamInner,
    path: Option<PathBuf>,
}

enum DeviceStreamInner {
    Node(File),
    Replay(BufReader<File>),
    Buffer(Cursor<Vec<u8>>),
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            DeviceStreamInner::Node(file) => file.read(buf),
            DeviceStreamInner::Replay(reader) => reader.read(buf),
            DeviceStreamInner::Buffer(cursor) => cursor.read(buf),
        }
    }
}

impl DeviceStream {
    /// Open a device node for reading (unbuffered, one report per read).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| TransportError::Open {
            path: path.clone(),
            source,
        })?;
        debug!(?path, "opened device node");
        Ok(Self {
            inner: DeviceStreamInner::Node(file),
            path: Some(path),
        })
    }

    /// Open a recorded frame dump for replay.
    pub fn replay(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| TransportError::Open {
            path: path.clone(),
            source,
        })?;
        debug!(?path, "opened replay file");
        Ok(Self {
            inner: DeviceStreamInner::Replay(BufReader::new(file)),
            path: Some(path),
        })
    }

    /// Serve frames from an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: DeviceStreamInner::Buffer(Cursor::new(bytes.into())),
            path: None,
        }
    }

    /// Path this stream was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self.inner {
            DeviceStreamInner::Node(_) => "device-node",
            DeviceStreamInner::Replay(_) => "replay-file",
            DeviceStreamInner::Buffer(_) => "memory",
        }
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream")
            .field("type", &self.transport_name())
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "acqsync-device-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    #[test]
    fn replay_reads_file_contents() {
        let dir = unique_temp_dir("replay");
        let dump = dir.join("frames.bin");
        std::fs::write(&dump, [7u8; 64]).unwrap();

        let mut stream = DeviceStream::replay(&dump).unwrap();
        assert_eq!(stream.transport_name(), "replay-file");
        assert_eq!(stream.path(), Some(dump.as_path()));

        let mut contents = Vec::new();
        stream.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, vec![7u8; 64]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn open_missing_node_reports_path() {
        let dir = unique_temp_dir("missing");
        let missing = dir.join("hidraw-missing");

        let err = DeviceStream::open(&missing).unwrap_err();
        match err {
            TransportError::Open { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn memory_stream_has_no_path() {
        let mut stream = DeviceStream::from_bytes(vec![1, 2, 3]);
        assert!(stream.path().is_none());
        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 3);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert!(format!("{stream:?}").contains("memory"));
    }
}
