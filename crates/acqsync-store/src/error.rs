use std::path::PathBuf;

/// Errors that can occur while persisting a session.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A session file already exists; nothing was created.
    #[error("session file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// A session file could not be created.
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred while writing.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata could not be serialized.
    #[error("metadata json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
