//! Store client.
//!
//! Wraps a CouchDB-style database URL and knows how to create-or-replace
//! documents, list them, and wipe the database. The store is the source of
//! truth for revisions: they're fetched right before they're needed and
//! never kept around.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::transport::{HttpTransport, Response, Transport};
use couchdocs_core::{DocumentTree, ID_FIELD};
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use tracing::{debug, info, warn};

/// Id prefix of design documents.
pub const DESIGN_PREFIX: &str = "_design/";

/// Reserved field holding a document's revision.
pub const REV_FIELD: &str = "_rev";

/// A document as fetched from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub revision: Option<String>,
    /// Everything except `_id` and `_rev`.
    pub fields: Map<String, Json>,
}

impl RemoteDocument {
    /// Splits a fetched JSON document into id, revision and fields.
    pub fn from_json(url: &str, doc: Json) -> Result<Self> {
        let Json::Object(mut fields) = doc else {
            return Err(StoreError::invalid(url, "expected a JSON object"));
        };

        let id = match fields.remove(ID_FIELD) {
            Some(Json::String(id)) => id,
            _ => return Err(StoreError::invalid(url, "document has no _id")),
        };
        let revision = match fields.remove(REV_FIELD) {
            Some(Json::String(rev)) => Some(rev),
            _ => None,
        };

        Ok(Self {
            id,
            revision,
            fields,
        })
    }

    /// True for documents in the `_design/` namespace.
    pub fn is_design(&self) -> bool {
        self.id.starts_with(DESIGN_PREFIX)
    }

    /// The document body with its `_id` but without the revision.
    pub fn into_json(self) -> Json {
        let mut doc = Map::with_capacity(self.fields.len() + 1);
        doc.insert(ID_FIELD.to_string(), Json::String(self.id));
        doc.extend(self.fields);
        Json::Object(doc)
    }
}

#[derive(Debug, Deserialize)]
struct AllDocs {
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    id: String,
}

/// Client for one database.
pub struct Store<T = HttpTransport> {
    url: String,
    transport: T,
    attachments: bool,
}

impl Store<HttpTransport> {
    /// Connects to the database at `url` over HTTP.
    pub fn connect(url: &str, config: &StoreConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(url, transport).with_attachments(config.attachments))
    }
}

impl<T: Transport> Store<T> {
    /// Creates a store on top of any transport.
    pub fn with_transport(url: &str, transport: T) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            transport,
            attachments: true,
        }
    }

    /// Whether fetched documents include inline attachment data.
    pub fn with_attachments(mut self, attachments: bool) -> Self {
        self.attachments = attachments;
        self
    }

    /// The database URL, without a trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// URL of a document in this database.
    ///
    /// The id is percent-encoded as a single path segment, except for the
    /// slash after `_design`.
    pub fn document_url(&self, id: &str) -> String {
        match id.strip_prefix(DESIGN_PREFIX) {
            Some(name) => format!("{}/{}{}", self.url, DESIGN_PREFIX, urlencoding::encode(name)),
            None => format!("{}/{}", self.url, urlencoding::encode(id)),
        }
    }

    /// Fetches and parses a JSON document.
    pub fn get(&self, url: &str) -> Result<Json> {
        let response = check("GET", url, self.transport.get(url)?)?;
        serde_json::from_str(&response.body).map_err(|e| StoreError::json(url, e))
    }

    /// Writes a document, failing with `Conflict` if the store refuses it.
    pub fn put(&self, url: &str, doc: &Json) -> Result<()> {
        let body = serde_json::to_string(doc).map_err(|e| StoreError::json(url, e))?;
        check("PUT", url, self.transport.put(url, Some(body))?)?;
        Ok(())
    }

    /// Deletes the current revision of a document.
    pub fn delete(&self, url: &str) -> Result<()> {
        let current = self.get(url)?;
        let rev = current
            .get(REV_FIELD)
            .and_then(Json::as_str)
            .ok_or_else(|| StoreError::MissingRevision {
                url: url.to_string(),
            })?;

        let target = format!("{}?rev={}", url, rev);
        check("DELETE", &target, self.transport.delete(&target)?)?;
        Ok(())
    }

    /// Creates or replaces the document at `url`.
    ///
    /// Tries a plain write first. On a conflict the existing document is
    /// deleted at its current revision and the write is retried once; a
    /// second failure is returned as is.
    pub fn upsert(&self, url: &str, doc: &Json) -> Result<()> {
        match self.put(url, doc) {
            Err(StoreError::Conflict { .. }) => {
                debug!("Conflict writing {}, replacing existing document", url);
                self.delete(url)?;
                self.put(url, doc)
            }
            other => other,
        }
    }

    /// Creates or replaces a document by id.
    pub fn put_document(&self, id: &str, doc: &Json) -> Result<()> {
        self.upsert(&self.document_url(id), doc)?;
        info!("Pushed {}", id);
        Ok(())
    }

    /// Pushes one design document per top-level key of `tree`.
    ///
    /// Returns how many were pushed.
    pub fn put_design_documents(&self, tree: &DocumentTree) -> Result<usize> {
        for (name, doc) in tree {
            let id = format!("{}{}", DESIGN_PREFIX, name);
            self.put_document(&id, &doc.to_json())?;
        }
        Ok(tree.len())
    }

    /// Drops the whole database and creates it again, empty.
    ///
    /// A database that doesn't exist yet is fine.
    pub fn recreate_destructive(&self) -> Result<()> {
        warn!("Recreating {}", self.url);
        match self
            .transport
            .delete(&self.url)
            .and_then(|response| check("DELETE", &self.url, response))
        {
            Ok(_) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        check("PUT", &self.url, self.transport.put(&self.url, None)?)?;
        Ok(())
    }

    /// Lists every document in the database.
    ///
    /// The id listing is fetched up front; each document is then fetched
    /// as the iterator is advanced, in listing order.
    pub fn list_all(&self) -> Result<impl Iterator<Item = Result<RemoteDocument>> + '_> {
        let listing_url = format!("{}/_all_docs", self.url);
        let listing: AllDocs = serde_json::from_value(self.get(&listing_url)?)
            .map_err(|e| StoreError::json(&listing_url, e))?;
        debug!("{} document(s) listed", listing.rows.len());

        let suffix = if self.attachments {
            "?attachments=true"
        } else {
            ""
        };

        Ok(listing.rows.into_iter().map(move |row| {
            let url = format!("{}{}", self.document_url(&row.id), suffix);
            RemoteDocument::from_json(&url, self.get(&url)?)
        }))
    }
}

/// Maps a response status onto the store's error kinds.
fn check(method: &'static str, url: &str, response: Response) -> Result<Response> {
    if response.is_success() {
        return Ok(response);
    }
    match response.status {
        404 => Err(StoreError::NotFound {
            url: url.to_string(),
        }),
        409 | 412 => Err(StoreError::Conflict {
            url: url.to_string(),
        }),
        status => Err(StoreError::Status {
            method,
            url: url.to_string(),
            status,
            body: response.body,
        }),
    }
}
