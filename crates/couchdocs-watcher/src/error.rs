//! Error types for watching directories.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Things that can go wrong while setting up or running a watch.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The OS-level watcher couldn't be created or attached.
    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),

    /// Couldn't scan the watched directory.
    #[error("failed to scan '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WatchError {
    /// Creates an IO error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
