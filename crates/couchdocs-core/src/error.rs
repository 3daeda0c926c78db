//! Error types for the directory codecs.
//!
//! We keep errors simple and actionable. Each variant tells you
//! which file or fragment was involved so the user can go fix it.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for functions that read or write document directories.
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Things that can go wrong when converting between directories and documents.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The root directory handed to a codec doesn't exist (or isn't a directory).
    #[error("directory '{0}' does not exist")]
    MissingRoot(PathBuf),

    /// Couldn't read or write a file on disk.
    #[error("i/o error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `.json` file (or a document body) isn't valid JSON.
    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A `!code` directive points at a fragment that isn't in `__lib`.
    #[error("cannot resolve library fragment '{path}': {source}")]
    MissingLibrary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document can't be mapped to the filesystem, usually because
    /// it has no string `_id` or isn't a JSON object.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// An attachment's `data` field isn't valid base64.
    #[error("attachment '{name}' has invalid base64 data: {source}")]
    Attachment {
        name: String,
        #[source]
        source: base64::DecodeError,
    },
}

impl DirectoryError {
    /// Creates an IO error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a JSON error with the path for context.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
