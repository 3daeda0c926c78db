//! Pushing directories to the store and dumping the store to directories.
//!
//! A project directory holds data documents at the top level and design
//! document sources under `_design/`. Every push rebuilds the document
//! trees from disk; nothing is cached between runs.

use crate::error::Result;
use crate::store::{RemoteDocument, Store};
use crate::transport::Transport;
use couchdocs_core::{DesignDirectory, DocumentDirectory, DESIGN_DIR};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Which documents a dump writes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpMode {
    #[default]
    All,
    DesignOnly,
    DataOnly,
}

impl DumpMode {
    /// Whether a fetched document passes this filter.
    pub fn includes(self, doc: &RemoteDocument) -> bool {
        match self {
            Self::All => true,
            Self::DesignOnly => doc.is_design(),
            Self::DataOnly => !doc.is_design(),
        }
    }
}

/// Counts from a push or dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Design documents pushed or written.
    pub design_documents: usize,

    /// Data documents pushed or written.
    pub documents: usize,

    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

/// Pushes a whole project directory: design documents, then data documents.
pub fn put_dir<T: Transport>(store: &Store<T>, dir: &Path) -> Result<SyncResult> {
    let start = Instant::now();

    let design_dir = dir.join(DESIGN_DIR);
    let design_documents = if design_dir.is_dir() {
        put_design_dir(store, &design_dir)?
    } else {
        debug!("No {} directory in {}", DESIGN_DIR, dir.display());
        0
    };
    let documents = put_document_dir(store, dir)?;

    let duration = start.elapsed();
    info!(
        "Pushed {} design and {} data document(s) in {:?}",
        design_documents, documents, duration
    );

    Ok(SyncResult {
        design_documents,
        documents,
        duration_ms: duration.as_millis() as u64,
    })
}

/// Pushes every design document found in a design directory.
pub fn put_design_dir<T: Transport>(store: &Store<T>, design_dir: &Path) -> Result<usize> {
    let tree = DesignDirectory::new(design_dir)?.load()?;
    store.put_design_documents(&tree)
}

/// Pushes every data document found in a directory.
pub fn put_document_dir<T: Transport>(store: &Store<T>, dir: &Path) -> Result<usize> {
    let documents = DocumentDirectory::new(dir)?.documents()?;
    for (id, doc) in &documents {
        store.put_document(id, doc)?;
    }
    Ok(documents.len())
}

/// Pushes the data document a single changed file belongs to.
///
/// `relative` is the changed path relative to `root`. Returns false when
/// the path isn't part of any data document (or the document's `.json`
/// file is gone), in which case nothing is sent.
pub fn put_file<T: Transport>(store: &Store<T>, root: &Path, relative: &Path) -> Result<bool> {
    let Some(id) = DocumentDirectory::document_id(relative) else {
        debug!("{} is not a document, skipping", relative.display());
        return Ok(false);
    };

    let documents = DocumentDirectory::new(root)?;
    let json_path = root.join(format!("{}.json", couchdocs_core::path::encode_segment(&id)));
    if !json_path.is_file() {
        warn!("{} has no {} to push, skipping", relative.display(), json_path.display());
        return Ok(false);
    }

    let doc = documents.load_document(&id)?;
    store.put_document(&id, &doc)?;
    Ok(true)
}

/// Writes the store's documents into a project directory.
///
/// Data documents become `<dir>/<id>.json`; design documents are spread
/// out under `<dir>/_design/<name>/`. Revisions are stripped.
pub fn dump<T: Transport>(store: &Store<T>, dir: &Path, mode: DumpMode) -> Result<SyncResult> {
    let start = Instant::now();
    let documents = DocumentDirectory::new(dir)?;
    let design = DesignDirectory::new(dir)?;

    let mut result = SyncResult::default();
    for doc in store.list_all()? {
        let doc = doc?;
        if !mode.includes(&doc) {
            debug!("Skipping {}", doc.id);
            continue;
        }

        if doc.is_design() {
            design.store_document(&doc.into_json())?;
            result.design_documents += 1;
        } else {
            documents.store_document(doc.into_json())?;
            result.documents += 1;
        }
    }

    let duration = start.elapsed();
    result.duration_ms = duration.as_millis() as u64;
    info!(
        "Dumped {} design and {} data document(s) in {:?}",
        result.design_documents, result.documents, duration
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeTransport;
    use std::fs;
    use tempfile::tempdir;

    fn listing() -> FakeTransport {
        FakeTransport::new()
            .respond(
                "GET db/_all_docs",
                200,
                r#"{"rows":[{"id":"foo"},{"id":"_design/bar"}]}"#,
            )
            .respond(
                "GET db/foo?attachments=true",
                200,
                r#"{"_id":"foo","_rev":"1-1234","n":1}"#,
            )
            .respond(
                "GET db/_design/bar?attachments=true",
                200,
                r#"{"_id":"_design/bar","_rev":"3-9","views":{"all":{"map":"function(doc){}"}}}"#,
            )
    }

    #[test]
    fn test_dump_all_writes_both_kinds() {
        let dir = tempdir().unwrap();
        let store = Store::with_transport("db", listing());

        let result = dump(&store, dir.path(), DumpMode::All).unwrap();

        assert_eq!(result.documents, 1);
        assert_eq!(result.design_documents, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("foo.json")).unwrap(),
            r#"{"_id":"foo","n":1}"#
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("_design/bar/views/all/map.js")).unwrap(),
            "function(doc){}"
        );
        assert!(!dir.path().join("_design/bar/_rev.js").exists());
    }

    #[test]
    fn test_dump_design_only() {
        let dir = tempdir().unwrap();
        let store = Store::with_transport("db", listing());

        let result = dump(&store, dir.path(), DumpMode::DesignOnly).unwrap();

        assert_eq!(result.documents, 0);
        assert!(!dir.path().join("foo.json").exists());
        assert!(dir.path().join("_design/bar/views/all/map.js").exists());
    }

    #[test]
    fn test_dump_data_only() {
        let dir = tempdir().unwrap();
        let store = Store::with_transport("db", listing());

        let result = dump(&store, dir.path(), DumpMode::DataOnly).unwrap();

        assert_eq!(result.design_documents, 0);
        assert!(dir.path().join("foo.json").exists());
        assert!(!dir.path().join("_design").exists());
    }

    #[test]
    fn test_dump_requires_existing_directory() {
        let dir = tempdir().unwrap();
        let store = Store::with_transport("db", listing());
        assert!(dump(&store, &dir.path().join("missing"), DumpMode::All).is_err());
        assert!(store.transport().calls().is_empty());
    }

    #[test]
    fn test_put_dir_pushes_design_then_documents() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("_design/app/views/all")).unwrap();
        fs::write(
            dir.path().join("_design/app/views/all/map.js"),
            "function(doc) { emit(null, doc); }",
        )
        .unwrap();
        fs::write(dir.path().join("foo.json"), r#"{"foo": "1"}"#).unwrap();

        let store = Store::with_transport("db", FakeTransport::new());
        let result = put_dir(&store, dir.path()).unwrap();

        assert_eq!(result.design_documents, 1);
        assert_eq!(result.documents, 1);
        assert_eq!(
            store.transport().calls(),
            vec!["PUT db/_design/app", "PUT db/foo"]
        );
        assert_eq!(
            store.transport().body_of("PUT db/foo").as_deref(),
            Some(r#"{"foo":"1"}"#)
        );
    }

    #[test]
    fn test_put_dir_encodes_slash_in_document_id() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a%2Fb.json"), r#"{"n": 1}"#).unwrap();

        let store = Store::with_transport("db", FakeTransport::new());
        put_dir(&store, dir.path()).unwrap();
        assert_eq!(store.transport().calls(), vec!["PUT db/a%2Fb"]);
    }

    #[test]
    fn test_dump_fetches_ids_with_reserved_characters() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::new()
            .respond(
                "GET db/_all_docs",
                200,
                r#"{"rows":[{"id":"a/b"},{"id":"q?x"}]}"#,
            )
            .respond("GET db/a%2Fb?attachments=true", 200, r#"{"_id":"a/b","_rev":"1-a"}"#)
            .respond("GET db/q%3Fx?attachments=true", 200, r#"{"_id":"q?x","_rev":"1-b"}"#);
        let store = Store::with_transport("db", transport);

        let result = dump(&store, dir.path(), DumpMode::All).unwrap();

        assert_eq!(result.documents, 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("a%2Fb.json")).unwrap(),
            r#"{"_id":"a/b"}"#
        );
        assert!(dir.path().join("q?x.json").exists());
    }

    #[test]
    fn test_put_dir_without_design_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.json"), "{}").unwrap();

        let store = Store::with_transport("db", FakeTransport::new());
        put_dir(&store, dir.path()).unwrap();
        assert_eq!(store.transport().calls(), vec!["PUT db/foo"]);
    }

    #[test]
    fn test_put_file_pushes_owning_document() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.json"), r#"{"foo": "1"}"#).unwrap();
        fs::create_dir(dir.path().join("foo")).unwrap();
        fs::write(dir.path().join("foo/pic.gif"), b"GIF89a").unwrap();

        let store = Store::with_transport("db", FakeTransport::new());

        assert!(put_file(&store, dir.path(), Path::new("foo.json")).unwrap());
        assert!(put_file(&store, dir.path(), Path::new("foo/pic.gif")).unwrap());
        assert!(!put_file(&store, dir.path(), Path::new("README")).unwrap());
        assert!(!put_file(&store, dir.path(), Path::new("gone.json")).unwrap());

        assert_eq!(store.transport().calls(), vec!["PUT db/foo", "PUT db/foo"]);
        let body = store.transport().body_of("PUT db/foo").unwrap();
        assert!(body.contains(r#""content_type":"image/gif""#));
    }
}
