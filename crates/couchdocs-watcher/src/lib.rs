//! couchdocs watcher - noticing local changes
//!
//! This crate handles the file system side of `push --watch`:
//! - Watching the project directory for changes
//! - Folding raw notifications into one event per path
//! - Deciding whether a batch needs a full or an incremental push
//! - Pushing each batch to the store
//!
//! Dot-files are ignored everywhere.

mod classify;
mod config;
mod error;
mod push;
mod scan;
mod watch_loop;
mod watcher;

pub use classify::{documents, is_design_doc_update, is_initial_add, ChangeEvent, ChangeKind, PushPlan};
pub use config::WatchConfig;
pub use error::{Result, WatchError};
pub use push::push_batch;
pub use scan::{relative_path, scan_directory};
pub use watch_loop::WatchLoop;
pub use watcher::{coalesce, FileWatcher};
