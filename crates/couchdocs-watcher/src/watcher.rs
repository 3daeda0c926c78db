//! File watcher for pushing changes as they happen.
//!
//! Uses the notify crate to watch the project directory and turns raw
//! events into root-relative [`ChangeEvent`]s.

use crate::classify::{ChangeEvent, ChangeKind};
use crate::error::Result;
use crate::scan::{relative_path, scan_directory};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use tracing::{debug, info, warn};

/// Watches a directory for file changes.
///
/// The first [`poll`](FileWatcher::poll) returns every file that was
/// already there as `Added`.
pub struct FileWatcher {
    #[allow(dead_code)]
    watcher: notify::RecommendedWatcher,
    receiver: Receiver<ChangeEvent>,
    pending: Vec<ChangeEvent>,
}

impl FileWatcher {
    /// Creates a new file watcher for the given directory.
    pub fn new(root: &Path) -> Result<Self> {
        let (tx, rx) = channel();

        // Some backends report canonical paths, others the path we asked for.
        let roots = Roots::new(root);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let Some(kind) = change_kind(&event.kind) else {
                        return;
                    };
                    for path in &event.paths {
                        if kind != ChangeKind::Removed && path.is_dir() {
                            continue;
                        }
                        let Some(relative) = roots.relative(path) else {
                            continue;
                        };
                        if relative.split('/').any(|part| part.starts_with('.')) {
                            continue;
                        }

                        debug!("File {}: {}", kind, relative);
                        if tx.send(ChangeEvent::new(kind, relative)).is_err() {
                            warn!("Failed to send file change event");
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        let pending = scan_directory(root)?;

        info!("Watching {} for changes", root.display());

        Ok(Self {
            watcher,
            receiver: rx,
            pending,
        })
    }

    /// Polls for file changes.
    ///
    /// Returns immediately with everything that happened since the last
    /// poll, one event per path.
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        let mut events = std::mem::take(&mut self.pending);
        events.extend(self.receiver.try_iter());
        coalesce(events)
    }
}

struct Roots {
    given: PathBuf,
    canonical: Option<PathBuf>,
}

impl Roots {
    fn new(root: &Path) -> Self {
        Self {
            given: root.to_path_buf(),
            canonical: root.canonicalize().ok(),
        }
    }

    fn relative(&self, path: &Path) -> Option<String> {
        relative_path(&self.given, path).or_else(|| {
            self.canonical
                .as_deref()
                .and_then(|root| relative_path(root, path))
        })
    }
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

/// Folds several events for the same path into one, keeping first-seen order.
pub fn coalesce(events: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut order: Vec<String> = Vec::new();
    let mut kinds: HashMap<String, ChangeKind> = HashMap::new();

    for event in events {
        match kinds.get(&event.path).copied() {
            None => {
                order.push(event.path.clone());
                kinds.insert(event.path, event.kind);
            }
            Some(previous) => {
                let kind = match (previous, event.kind) {
                    (_, ChangeKind::Removed) => ChangeKind::Removed,
                    (ChangeKind::Added, ChangeKind::Modified) => ChangeKind::Added,
                    (ChangeKind::Removed, ChangeKind::Added) => ChangeKind::Modified,
                    (_, later) => later,
                };
                kinds.insert(event.path, kind);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|path| {
            let kind = kinds.remove(&path)?;
            Some(ChangeEvent::new(kind, path))
        })
        .collect()
}
