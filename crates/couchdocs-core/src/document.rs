//! Data document directories.
//!
//! Plain documents are one `<id>.json` file each, directly in the project
//! directory, with an optional `<id>/` directory of attachments next to it.

use crate::attachments;
use crate::design::ID_FIELD;
use crate::error::{DirectoryError, Result};
use crate::path::{decode_segment, encode_segment, is_hidden};
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// A directory of data documents.
#[derive(Debug, Clone)]
pub struct DocumentDirectory {
    root: PathBuf,
}

impl DocumentDirectory {
    /// Opens a document directory. The directory must already exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DirectoryError::MissingRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads every `*.json` document in the directory, sorted by id.
    pub fn documents(&self) -> Result<Vec<(String, Json)>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| DirectoryError::io(&self.root, e))? {
            let path = entry.map_err(|e| DirectoryError::io(&self.root, e))?.path();
            if !path.is_file() || is_hidden(&path) {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(decode_segment(stem));
            }
        }
        ids.sort();

        ids.into_iter()
            .map(|id| {
                let doc = self.load_document(&id)?;
                Ok((id, doc))
            })
            .collect()
    }

    /// Loads a single document by id, packing its attachments if it has any.
    pub fn load_document(&self, id: &str) -> Result<Json> {
        let path = self.json_path(id);
        debug!("Reading document {}", path.display());
        let source = fs::read_to_string(&path).map_err(|e| DirectoryError::io(&path, e))?;
        let mut doc = match serde_json::from_str::<Json>(&source).map_err(|e| DirectoryError::json(&path, e))? {
            Json::Object(map) => map,
            _ => {
                return Err(DirectoryError::InvalidDocument(format!(
                    "'{}' is not a JSON object",
                    path.display()
                )))
            }
        };

        let attachment_dir = self.attachment_dir(id);
        if attachment_dir.is_dir() {
            attachments::pack(&mut doc, &attachment_dir)?;
        }

        Ok(Json::Object(doc))
    }

    /// Figures out which document a changed file belongs to.
    ///
    /// `foo.json` and anything directly inside `foo/` both map to `foo`.
    /// Returns None for paths that aren't part of a data document.
    pub fn document_id(relative: &Path) -> Option<String> {
        let components: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;

        match components.as_slice() {
            [file] => file.strip_suffix(".json").map(decode_segment),
            [dir, _attachment] => Some(decode_segment(dir)),
            _ => None,
        }
    }

    /// Writes a document to `<id>.json`, unpacking attachments into `<id>/`.
    pub fn store_document(&self, doc: Json) -> Result<()> {
        let Json::Object(mut doc) = doc else {
            return Err(DirectoryError::InvalidDocument(
                "document is not a JSON object".to_string(),
            ));
        };
        let id = document_id_field(&doc)?;

        attachments::unpack(&mut doc, &self.attachment_dir(&id))?;

        let path = self.json_path(&id);
        let body = serde_json::to_string(&doc).map_err(|e| DirectoryError::json(&path, e))?;
        fs::write(&path, body).map_err(|e| DirectoryError::io(&path, e))?;
        info!("Stored document {}", id);
        Ok(())
    }

    fn json_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_segment(id)))
    }

    fn attachment_dir(&self, id: &str) -> PathBuf {
        self.root.join(encode_segment(id))
    }
}

fn document_id_field(doc: &Map<String, Json>) -> Result<String> {
    doc.get(ID_FIELD)
        .and_then(Json::as_str)
        .map(str::to_owned)
        .ok_or_else(|| DirectoryError::InvalidDocument("document has no _id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::{encode, ATTACHMENTS_FIELD};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_requires_existing_root() {
        let dir = tempdir().unwrap();
        assert!(DocumentDirectory::new(dir.path().join("foo")).is_err());
        assert!(DocumentDirectory::new(dir.path()).is_ok());
    }

    #[test]
    fn test_iterates_documents_in_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.json"), r#"{"foo": "1"}"#).unwrap();
        fs::write(dir.path().join("bar.json"), r#"{"bar": "2"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
        fs::create_dir(dir.path().join("_design")).unwrap();

        let docs = DocumentDirectory::new(dir.path()).unwrap().documents().unwrap();
        assert_eq!(
            docs,
            vec![
                ("bar".to_string(), json!({"bar": "2"})),
                ("foo".to_string(), json!({"foo": "1"})),
            ]
        );
    }

    #[test]
    fn test_packs_attachment_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.json"), r#"{"foo": "1"}"#).unwrap();
        fs::create_dir(dir.path().join("foo")).unwrap();
        fs::write(dir.path().join("foo").join("logo.png"), b"png!").unwrap();

        let doc = DocumentDirectory::new(dir.path())
            .unwrap()
            .load_document("foo")
            .unwrap();
        assert_eq!(
            doc[ATTACHMENTS_FIELD]["logo.png"],
            json!({"data": encode(b"png!"), "content_type": "image/png"})
        );
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("list.json"), "[1, 2]").unwrap();
        let err = DocumentDirectory::new(dir.path())
            .unwrap()
            .load_document("list")
            .unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidDocument(_)));
    }

    #[test]
    fn test_store_document_as_json() {
        let dir = tempdir().unwrap();
        let docs = DocumentDirectory::new(dir.path()).unwrap();

        docs.store_document(json!({"_id": "foo"})).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("foo.json")).unwrap(),
            r#"{"_id":"foo"}"#
        );
    }

    #[test]
    fn test_store_document_unpacks_attachments() {
        let dir = tempdir().unwrap();
        let docs = DocumentDirectory::new(dir.path()).unwrap();

        docs.store_document(json!({
            "_id": "foo",
            "_attachments": {"a.gif": {"data": encode(b"GIF89a"), "content_type": "image/gif"}}
        }))
        .unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("foo.json")).unwrap(),
            r#"{"_id":"foo"}"#
        );
        assert_eq!(fs::read(dir.path().join("foo").join("a.gif")).unwrap(), b"GIF89a");
    }

    #[test]
    fn test_store_requires_id() {
        let dir = tempdir().unwrap();
        let docs = DocumentDirectory::new(dir.path()).unwrap();
        assert!(docs.store_document(json!({"foo": 1})).is_err());
    }

    #[test]
    fn test_document_id_from_changed_path() {
        assert_eq!(
            DocumentDirectory::document_id(Path::new("foo.json")),
            Some("foo".to_string())
        );
        assert_eq!(
            DocumentDirectory::document_id(Path::new("foo/logo.png")),
            Some("foo".to_string())
        );
        assert_eq!(
            DocumentDirectory::document_id(Path::new("a%2Fb.json")),
            Some("a/b".to_string())
        );
        assert_eq!(DocumentDirectory::document_id(Path::new("notes.txt")), None);
        assert_eq!(DocumentDirectory::document_id(Path::new("a/b/c.png")), None);
    }
}
