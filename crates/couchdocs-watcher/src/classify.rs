//! Change classification.
//!
//! Design documents are assembled from many files, so any change under
//! `_design/` means the whole design tree gets rebuilt and pushed. Data
//! documents map one-to-one to files and can be pushed individually.

use couchdocs_core::DESIGN_DIR;
use std::fmt;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        };
        write!(f, "{}", s)
    }
}

/// A single change, with a `/`-separated path relative to the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: String,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// True if the path is the design directory or anything below it.
    pub fn is_design(&self) -> bool {
        self.path == DESIGN_DIR
            || self
                .path
                .strip_prefix(DESIGN_DIR)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// True when every event is an addition, as in the first scan after
/// the watch starts.
pub fn is_initial_add(events: &[ChangeEvent]) -> bool {
    events.iter().all(|event| event.kind == ChangeKind::Added)
}

/// True when anything changed under the design directory.
pub fn is_design_doc_update(events: &[ChangeEvent]) -> bool {
    events.iter().any(ChangeEvent::is_design)
}

/// The events that concern data documents, in their original order.
pub fn documents(events: &[ChangeEvent]) -> Vec<ChangeEvent> {
    events
        .iter()
        .filter(|event| !event.is_design())
        .cloned()
        .collect()
}

/// What to push for one batch of changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushPlan {
    /// Push everything, design and data.
    Full,
    /// Rebuild the design tree if `design` is set, then push each document.
    Incremental {
        design: bool,
        documents: Vec<ChangeEvent>,
    },
}

impl PushPlan {
    /// Decides how to push a batch.
    pub fn for_batch(events: &[ChangeEvent]) -> Self {
        if is_initial_add(events) {
            return Self::Full;
        }
        Self::Incremental {
            design: is_design_doc_update(events),
            documents: documents(events),
        }
    }
}
