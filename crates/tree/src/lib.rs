//! Metadata tree for files stored as remote chunks.
//!
//! The tree is a plain owned structure: every [`Directory`] owns its child
//! directories and its [`FileRecord`]s by value, and every traversal starts
//! at the root. [`MetadataTree`] wraps the root together with a
//! [`TreeStore`] and flushes the whole tree after each mutation.

mod directory;
mod id;
mod path;
mod store;
mod tree;

pub use directory::{Directory, FileRecord, ROOT_NAME};
pub use id::{FILE_ID_LEN, generate_file_id};
pub use path::DirPath;
pub use store::{JsonFileStore, MemoryStore, TreeStore};
pub use tree::MetadataTree;

/// Errors produced by the tree crate.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
