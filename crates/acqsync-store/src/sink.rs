use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use acqsync_frame::{Marker, SampleBlock};
use bytes::{BufMut, BytesMut};
use tracing::{debug, error, info, warn};

use crate::error::{Result, StoreError};
use crate::metadata::SessionMetadata;

const SAMPLES_EXTENSION: &str = "eeg";
const MARKERS_EXTENSION: &str = "marker";
const METADATA_EXTENSION: &str = "meta";

/// Locations of the three files of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub samples: PathBuf,
    pub markers: PathBuf,
    pub metadata: PathBuf,
}

impl SessionPaths {
    /// `<base>.eeg`, `<base>.marker` and `<base>.meta`.
    pub fn from_base(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref().as_os_str();
        let with_ext = |ext: &str| {
            let mut path = base.to_os_string();
            path.push(".");
            path.push(ext);
            PathBuf::from(path)
        };
        Self {
            samples: with_ext(SAMPLES_EXTENSION),
            markers: with_ext(MARKERS_EXTENSION),
            metadata: with_ext(METADATA_EXTENSION),
        }
    }

    /// All three paths, samples first.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [&self.samples, &self.markers, &self.metadata]
            .into_iter()
            .map(PathBuf::as_path)
    }

    /// Fail if any of the files exists.
    pub fn ensure_absent(&self) -> Result<()> {
        for path in self.iter() {
            // Treat an unreadable parent as "exists" rather than overwrite blindly.
            if path.try_exists().unwrap_or(true) {
                error!(?path, "session file already exists, aborting");
                return Err(StoreError::AlreadyExists {
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

/// Open session files being recorded into.
pub struct SessionSink {
    paths: SessionPaths,
    samples: BufWriter<File>,
    markers: BufWriter<File>,
    metadata: File,
    buf: BytesMut,
    samples_written: u64,
    markers_written: u64,
}

impl SessionSink {
    /// Create all three files and write the metadata.
    ///
    /// If any of the files already exists nothing is created. If a later
    /// step fails the files created so far are removed again.
    pub fn create(paths: SessionPaths, metadata: &SessionMetadata) -> Result<Self> {
        paths.ensure_absent()?;

        let (samples, markers, metadata_file) = {
            let mut created = Vec::with_capacity(3);
            match open_all(&paths, metadata, &mut created) {
                Ok(files) => files,
                Err(err) => {
                    for path in created {
                        if let Err(remove) = std::fs::remove_file(path) {
                            warn!(?path, error = %remove, "could not remove partial session file");
                        }
                    }
                    return Err(err);
                }
            }
        };

        info!(samples = ?paths.samples, "recording session");
        Ok(Self {
            paths,
            samples: BufWriter::new(samples),
            markers: BufWriter::new(markers),
            metadata: metadata_file,
            buf: BytesMut::new(),
            samples_written: 0,
            markers_written: 0,
        })
    }

    /// Append one block.
    ///
    /// `markers` carry offsets relative to the block; `global_offset` is the
    /// index of the block's first sample within the session.
    pub fn write_block(
        &mut self,
        block: &SampleBlock,
        markers: &[Marker],
        global_offset: u64,
    ) -> Result<()> {
        for marker in markers {
            writeln!(
                self.markers,
                "{} {}",
                global_offset + marker.offset,
                marker.label
            )?;
        }

        self.buf.clear();
        self.buf.reserve(block.data().len() * std::mem::size_of::<f32>());
        for &value in block.data() {
            self.buf.put_f32_le(value);
        }
        self.samples.write_all(&self.buf)?;

        self.samples_written += block.len() as u64;
        self.markers_written += markers.len() as u64;
        Ok(())
    }

    /// Flush and sync all files, then close them.
    pub fn close(mut self) -> Result<()> {
        self.markers.flush()?;
        self.samples.flush()?;
        self.markers.get_ref().sync_all()?;
        self.samples.get_ref().sync_all()?;
        self.metadata.sync_all()?;
        debug!(
            samples = self.samples_written,
            markers = self.markers_written,
            "closed session files"
        );
        Ok(())
    }

    /// Close and delete all three files.
    ///
    /// Used when a session fails to start after its files were created.
    pub fn discard(self) -> Result<()> {
        let Self {
            paths,
            samples,
            markers,
            metadata,
            ..
        } = self;
        drop((samples, markers, metadata));
        for path in paths.iter() {
            std::fs::remove_file(path)?;
        }
        debug!(samples = ?paths.samples, "discarded session files");
        Ok(())
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Sample rows written so far.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Marker lines written so far.
    pub fn markers_written(&self) -> u64 {
        self.markers_written
    }
}

impl std::fmt::Debug for SessionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSink")
            .field("paths", &self.paths)
            .field("samples_written", &self.samples_written)
            .field("markers_written", &self.markers_written)
            .finish()
    }
}

/// Create the files in order, pushing each path onto `created` once it
/// exists on disk.
fn open_all<'a>(
    paths: &'a SessionPaths,
    metadata: &SessionMetadata,
    created: &mut Vec<&'a Path>,
) -> Result<(File, File, File)> {
    let samples = create_new(&paths.samples)?;
    created.push(&paths.samples);
    let markers = create_new(&paths.markers)?;
    created.push(&paths.markers);
    let mut metadata_file = create_new(&paths.metadata)?;
    created.push(&paths.metadata);

    serde_json::to_writer_pretty(&mut metadata_file, metadata)?;
    metadata_file.write_all(b"\n")?;
    metadata_file.flush()?;
    Ok((samples, markers, metadata_file))
}

fn create_new(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                StoreError::AlreadyExists {
                    path: path.to_path_buf(),
                }
            } else {
                StoreError::Create {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
}
