//! Persistence backends for the metadata tree.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Directory, TreeError};

/// Durable storage for the whole tree.
///
/// `save` is called after every mutation; the mutation is not complete
/// until it returns.
pub trait TreeStore: Send + Sync {
    /// Reads the stored tree. `None` means nothing has been stored yet.
    fn load(&self) -> Result<Option<Directory>, TreeError>;

    /// Durably replaces the stored tree.
    fn save(&self, root: &Directory) -> Result<(), TreeError>;
}

/// Stores the tree as pretty-printed JSON in a single file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TreeStore for JsonFileStore {
    fn load(&self) -> Result<Option<Directory>, TreeError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, root: &Directory) -> Result<(), TreeError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(root)?;

        // Write-then-rename so a crash never leaves a truncated tree.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::trace!(path = %self.path.display(), "tree saved");
        Ok(())
    }
}

/// Keeps the last saved tree in memory.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Option<Directory>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an already stored tree.
    pub fn with_tree(root: Directory) -> Self {
        Self {
            saved: Mutex::new(Some(root)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Returns the last saved tree.
    pub fn snapshot(&self) -> Option<Directory> {
        self.saved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TreeStore for MemoryStore {
    fn load(&self) -> Result<Option<Directory>, TreeError> {
        Ok(self.snapshot())
    }

    fn save(&self, root: &Directory) -> Result<(), TreeError> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(root.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<T: TreeStore + ?Sized> TreeStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<Directory>, TreeError> {
        (**self).load()
    }

    fn save(&self, root: &Directory) -> Result<(), TreeError> {
        (**self).save(root)
    }
}
