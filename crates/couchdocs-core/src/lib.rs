//! couchdocs core - directory <-> document codecs
//!
//! This crate turns directories on disk into the JSON documents that get
//! pushed to a CouchDB-style store, and turns fetched documents back into
//! files. It knows nothing about HTTP.
//!
//! - [`DesignDirectory`]: many small `.js`/`.json` files per design document,
//!   with `!code` macros pulling shared fragments out of `__lib`
//! - [`DocumentDirectory`]: one `<id>.json` per data document, attachments
//!   in a sibling `<id>/` directory
//!
//! # Example
//!
//! ```no_run
//! use couchdocs_core::DesignDirectory;
//!
//! let design = DesignDirectory::new("./_design").unwrap();
//! let tree = design.load().unwrap();
//! for (name, _) in &tree {
//!     println!("_design/{}", name);
//! }
//! ```

pub mod attachments;
pub mod design;
pub mod document;
pub mod error;
pub mod macros;
pub mod path;
pub mod tree;

pub use attachments::{Attachment, ATTACHMENTS_FIELD};
pub use design::{DesignDirectory, LeafKind, DESIGN_DIR, ID_FIELD};
pub use document::DocumentDirectory;
pub use error::{DirectoryError, Result};
pub use macros::{MacroExpander, LIB_DIR};
pub use tree::{DocumentTree, Value};
