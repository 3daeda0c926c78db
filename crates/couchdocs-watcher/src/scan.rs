//! Directory scanning.
//!
//! Walks the watched directory once at startup so the first batch the
//! loop sees lists every existing file as added.

use crate::classify::{ChangeEvent, ChangeKind};
use crate::error::{Result, WatchError};
use couchdocs_core::path::is_hidden;
use std::path::{Component, Path};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Lists every regular, non-hidden file below `root` as an `Added` event.
///
/// # Example
///
/// ```no_run
/// use couchdocs_watcher::scan_directory;
/// use std::path::Path;
///
/// let events = scan_directory(Path::new(".")).unwrap();
/// println!("{} files", events.len());
/// ```
pub fn scan_directory(root: &Path) -> Result<Vec<ChangeEvent>> {
    let mut events = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry.path()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            WatchError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(path) = relative_path(root, entry.path()) {
            debug!("Found {}", path);
            events.push(ChangeEvent::new(ChangeKind::Added, path));
        }
    }

    info!("Scanned {} file(s) in {}", events.len(), root.display());
    Ok(events)
}

/// Turns an absolute path into a `/`-separated path relative to `root`.
///
/// Returns None for paths outside `root`, the root itself, and paths that
/// aren't valid UTF-8.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
