//! couchdocs store - talking to the remote document store
//!
//! This crate handles the network side of things:
//! - Create-or-replace writes with a single delete-and-retry on conflict
//! - Listing and fetching every document in a database
//! - Pushing project directories and dumping databases back to disk
//!
//! The HTTP layer sits behind the [`Transport`] trait.

mod config;
mod error;
#[cfg(test)]
mod fake;
mod store;
pub mod sync;
mod transport;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use store::{RemoteDocument, Store, DESIGN_PREFIX, REV_FIELD};
pub use sync::{dump, put_dir, put_file, DumpMode, SyncResult};
pub use transport::{HttpTransport, Response, Transport};
