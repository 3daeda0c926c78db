//! Design directories.
//!
//! A design directory keeps each design document spread out over many
//! small files: `<root>/<doc>/views/by_name/map.js` becomes the field
//! `views.by_name.map` of design document `<doc>`. Loading walks the tree
//! and deep-merges every file into one DocumentTree; storing does the
//! inverse, one file per leaf.

use crate::error::{DirectoryError, Result};
use crate::macros::{self, MacroExpander, LIB_DIR};
use crate::path::{decode_segment, encode_segment, is_hidden};
use crate::tree::{DocumentTree, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Name of the design subdirectory inside a project directory.
pub const DESIGN_DIR: &str = "_design";

/// Reserved document field that never becomes a file.
pub const ID_FIELD: &str = "_id";

/// The kinds of leaf files a design directory understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// `.js`, read as text with macro expansion.
    Code,
    /// `.json`, parsed as any JSON value.
    Data,
}

impl LeafKind {
    /// Detects the leaf kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "js" => Some(Self::Code),
            "json" => Some(Self::Data),
            _ => None,
        }
    }

    /// File extension (without the dot) for this kind.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Code => "js",
            Self::Data => "json",
        }
    }
}

/// A directory of design document sources.
#[derive(Debug, Clone)]
pub struct DesignDirectory {
    root: PathBuf,
    macros: MacroExpander,
}

impl DesignDirectory {
    /// Opens a design directory. The directory must already exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DirectoryError::MissingRoot(root));
        }
        let macros = MacroExpander::new(&root);
        Ok(Self { root, macros })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Load

    /// Reads every leaf file into one document tree.
    ///
    /// Files are visited in sorted order, so when two files land on the
    /// same key the later one wins. Every directory becomes a subtree, even
    /// an empty one. The `__lib` fragment directory and hidden files are
    /// skipped.
    pub fn load(&self) -> Result<DocumentTree> {
        let mut tree = DocumentTree::new();

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !is_hidden(entry.path())
                    && !(entry.depth() == 1 && entry.file_name() == LIB_DIR)
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                DirectoryError::io(path, e.into())
            })?;
            if entry.file_type().is_dir() {
                let segments = self.segments(entry.path());
                tree.merge(DocumentTree::from_path(segments, Value::Tree(DocumentTree::new())));
                continue;
            }
            if !entry.file_type().is_file() || LeafKind::from_path(entry.path()).is_none() {
                continue;
            }

            let (segments, value) = self.expand_file(entry.path())?;
            tree.merge(DocumentTree::from_path(segments, value));
        }

        info!("Loaded {} design document(s) from {}", tree.len(), self.root.display());
        Ok(tree)
    }

    /// Splits a file into its key path and leaf value.
    ///
    /// `<root>/a/b/c.js` gives `(["a", "b", "c"], Code(...))`.
    pub fn expand_file(&self, path: &Path) -> Result<(Vec<String>, Value)> {
        let kind = LeafKind::from_path(path).ok_or_else(|| {
            DirectoryError::InvalidDocument(format!("unsupported file '{}'", path.display()))
        })?;
        let mut segments = path.parent().map(|dir| self.segments(dir)).unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        segments.push(decode_segment(&stem));

        let value = self.read_value(path, kind)?;
        Ok((segments, value))
    }

    /// Decoded key path of a directory below the root.
    fn segments(&self, dir: &Path) -> Vec<String> {
        dir.strip_prefix(&self.root)
            .unwrap_or(dir)
            .components()
            .map(|c| decode_segment(&c.as_os_str().to_string_lossy()))
            .collect()
    }

    /// Reads one leaf file.
    pub fn read_value(&self, path: &Path, kind: LeafKind) -> Result<Value> {
        debug!("Reading {}", path.display());
        let source = fs::read_to_string(path).map_err(|e| DirectoryError::io(path, e))?;
        match kind {
            LeafKind::Code => Ok(Value::Code(self.macros.expand(&source)?)),
            LeafKind::Data => serde_json::from_str(&source)
                .map(Value::Json)
                .map_err(|e| DirectoryError::json(path, e)),
        }
    }

    // Store

    /// Writes a whole tree. Each top-level key is a document id.
    pub fn store(&self, tree: &DocumentTree) -> Result<()> {
        for (id, value) in tree {
            self.store_value(id, value)?;
        }
        Ok(())
    }

    /// Writes a single document fetched from the store.
    ///
    /// The `_id` decides where it goes: `_design/foo` lands in
    /// `<root>/_design/foo/`.
    pub fn store_document(&self, doc: &serde_json::Value) -> Result<()> {
        let id = doc
            .get(ID_FIELD)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| DirectoryError::InvalidDocument("document has no _id".to_string()))?;
        info!("Storing design document {}", id);
        self.store_value(id, &Value::from_json(doc.clone()))
    }

    fn store_value(&self, id: &str, value: &Value) -> Result<()> {
        let mut components: Vec<&str> = id.split('/').filter(|c| !c.is_empty()).collect();
        let Some(last) = components.pop() else {
            return Err(DirectoryError::InvalidDocument(format!("empty document id '{}'", id)));
        };
        let parent = components
            .iter()
            .fold(self.root.clone(), |dir, component| dir.join(encode_segment(component)));

        match value {
            Value::Tree(doc) => {
                let dir = parent.join(encode_segment(last));
                fs::create_dir_all(&dir).map_err(|e| DirectoryError::io(&dir, e))?;
                for (key, value) in doc.iter().filter(|(key, _)| key.as_str() != ID_FIELD) {
                    save_value(&dir, key, value)?;
                }
                Ok(())
            }
            leaf => save_value(&parent, last, leaf),
        }
    }
}

/// Writes one key of a document below `dir`, recursing into subtrees.
fn save_value(dir: &Path, key: &str, value: &Value) -> Result<()> {
    let name = encode_segment(key);
    let (path, contents) = match value {
        Value::Tree(tree) => {
            let sub = dir.join(name);
            fs::create_dir_all(&sub).map_err(|e| DirectoryError::io(&sub, e))?;
            for (key, value) in tree {
                save_value(&sub, key, value)?;
            }
            return Ok(());
        }
        Value::Json(json) => (
            dir.join(format!("{}.{}", name, LeafKind::Data.extension())),
            serde_json::to_string(json).map_err(|e| DirectoryError::json(dir, e))?,
        ),
        Value::Code(text) => (
            dir.join(format!("{}.{}", name, LeafKind::Code.extension())),
            macros::contract(text),
        ),
    };

    fs::create_dir_all(dir).map_err(|e| DirectoryError::io(dir, e))?;
    debug!("Writing {}", path.display());
    fs::write(&path, contents).map_err(|e| DirectoryError::io(&path, e))
}
