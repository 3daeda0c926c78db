//! Binary attachments.
//!
//! A data document `foo.json` can have a sibling directory `foo/`. Every
//! regular file in there is packed into the document's `_attachments`
//! map as base64, and unpacked back into that directory when the document
//! is written to disk.

use crate::error::{DirectoryError, Result};
use crate::path::{encode_segment, is_hidden};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Reserved document field holding attachments.
pub const ATTACHMENTS_FIELD: &str = "_attachments";

/// Characters per line in encoded attachment data.
const LINE_WIDTH: usize = 60;

/// One attachment entry as it appears in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Base64 text, wrapped at 60 columns with `\n` after every line.
    pub data: String,

    /// Only present when the file extension is one we recognize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Attachment {
    /// Builds an attachment from raw bytes and the file name they came from.
    pub fn new(name: &str, bytes: &[u8]) -> Self {
        Self {
            data: encode(bytes),
            content_type: content_type_for(name).map(str::to_owned),
        }
    }

    /// Reads a file from disk into an attachment.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| DirectoryError::io(path, e))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Ok(Self::new(name, &bytes))
    }
}

/// Looks up the content type for a file name by extension.
pub fn content_type_for(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "gif" => Some("image/gif"),
        "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// Encodes bytes as line-wrapped base64.
pub fn encode(bytes: &[u8]) -> String {
    let flat = STANDARD.encode(bytes);
    let mut wrapped = String::with_capacity(flat.len() + flat.len() / LINE_WIDTH + 1);
    let mut rest = flat.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(LINE_WIDTH));
        wrapped.push_str(line);
        wrapped.push('\n');
        rest = tail;
    }
    wrapped
}

/// Decodes base64 attachment data, wrapped or not.
pub fn decode(data: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Merges every file in `dir` into the document's `_attachments` map.
///
/// Files found on disk replace same-named entries already in the document;
/// entries without a file are left as they are.
pub fn pack(doc: &mut Map<String, Json>, dir: &Path) -> Result<()> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| DirectoryError::io(dir, e))? {
        let path = entry.map_err(|e| DirectoryError::io(dir, e))?.path();
        if path.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();

    let attachments = match doc
        .entry(ATTACHMENTS_FIELD)
        .or_insert_with(|| Json::Object(Map::new()))
    {
        Json::Object(map) => map,
        _ => {
            return Err(DirectoryError::InvalidDocument(format!(
                "'{}' must be an object",
                ATTACHMENTS_FIELD
            )))
        }
    };

    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("Skipping attachment with non UTF-8 name: {}", path.display());
            continue;
        };
        debug!("Packing attachment {}", path.display());
        let attachment = Attachment::from_file(&path)?;
        let value = serde_json::to_value(attachment).map_err(|e| DirectoryError::json(&path, e))?;
        attachments.insert(name.to_string(), value);
    }

    Ok(())
}

/// Removes `_attachments` from the document and writes each entry into `dir`.
///
/// Does nothing when the document has no attachments. Entries without
/// inline `data` (stubs) are skipped.
pub fn unpack(doc: &mut Map<String, Json>, dir: &Path) -> Result<()> {
    let Some(attachments) = doc.remove(ATTACHMENTS_FIELD) else {
        return Ok(());
    };
    let Json::Object(attachments) = attachments else {
        return Err(DirectoryError::InvalidDocument(format!(
            "'{}' must be an object",
            ATTACHMENTS_FIELD
        )));
    };

    fs::create_dir_all(dir).map_err(|e| DirectoryError::io(dir, e))?;

    for (name, entry) in attachments {
        let Some(data) = entry.get("data").and_then(Json::as_str) else {
            warn!("Attachment '{}' has no inline data, skipping", name);
            continue;
        };
        let bytes = decode(data).map_err(|source| DirectoryError::Attachment {
            name: name.clone(),
            source,
        })?;
        let path = dir.join(encode_segment(&name));
        debug!("Writing attachment {}", path.display());
        fs::write(&path, bytes).map_err(|e| DirectoryError::io(&path, e))?;
    }

    Ok(())
}
