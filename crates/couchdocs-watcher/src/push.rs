//! Pushing one batch of changes.
//!
//! The first batch of a watch lists every file and becomes a full push.
//! After that only the design tree (if anything under `_design/` moved)
//! and the data documents named by the batch are sent.

use crate::classify::{ChangeEvent, ChangeKind, PushPlan};
use couchdocs_core::DESIGN_DIR;
use couchdocs_store::sync::put_design_dir;
use couchdocs_store::{put_dir, put_file, Result, Store, SyncResult, Transport};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pushes whatever a batch of changes under `dir` calls for.
///
/// Removed files are skipped with a warning: deletions never reach the
/// store. The first failing request aborts the batch.
pub fn push_batch<T: Transport>(
    store: &Store<T>,
    dir: &Path,
    events: &[ChangeEvent],
) -> Result<SyncResult> {
    let (design, documents) = match PushPlan::for_batch(events) {
        PushPlan::Full => return put_dir(store, dir),
        PushPlan::Incremental { design, documents } => (design, documents),
    };

    let start = Instant::now();
    let mut result = SyncResult::default();

    if design {
        let design_dir = dir.join(DESIGN_DIR);
        if design_dir.is_dir() {
            result.design_documents = put_design_dir(store, &design_dir)?;
        } else {
            debug!("{} is gone, nothing to push", design_dir.display());
        }
    }

    for event in documents {
        if event.kind == ChangeKind::Removed {
            warn!("{} was removed; deletions are not pushed", event.path);
            continue;
        }
        if put_file(store, dir, Path::new(&event.path))? {
            result.documents += 1;
        }
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Pushed {} design and {} data document(s) for {} change(s)",
        result.design_documents,
        result.documents,
        events.len()
    );
    Ok(result)
}
