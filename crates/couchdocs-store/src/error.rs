//! Error types for talking to the document store.

use couchdocs_core::DirectoryError;
use thiserror::Error;

/// Convenience type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Things that can go wrong while pushing to or dumping from the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request never got a response (connection refused, timeout, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The document or database isn't there.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// The store refused a write because of a revision mismatch.
    #[error("update conflict at {url}")]
    Conflict { url: String },

    /// Any other non-success response.
    #[error("{method} {url} failed with status {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// The store answered with something that isn't the JSON we expected.
    #[error("invalid response from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A fetched document isn't shaped like a document.
    #[error("unexpected document at {url}: {reason}")]
    InvalidDocument { url: String, reason: String },

    /// A fetched document has no `_rev`, so it can't be deleted.
    #[error("document at {url} has no revision")]
    MissingRevision { url: String },

    /// Reading or writing the local directory failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl StoreError {
    /// Creates a JSON error with the URL for context.
    pub fn json(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            url: url.into(),
            source,
        }
    }

    pub fn invalid(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
