use tracing::{debug, info};

use crate::{DirPath, Directory, FileRecord, TreeError, TreeStore};

/// The metadata tree plus the store it is flushed to.
///
/// Every mutating method saves the full tree before returning. Operations
/// on unknown identifiers change nothing and report `false`.
pub struct MetadataTree {
    root: Directory,
    store: Box<dyn TreeStore>,
}

impl MetadataTree {
    /// Loads the tree from `store` and purges uploads that never finished.
    ///
    /// A store with nothing saved yet starts from an empty root.
    pub fn load(store: impl TreeStore + 'static) -> Result<Self, TreeError> {
        let root = store.load()?.unwrap_or_else(Directory::root);
        let mut tree = Self {
            root,
            store: Box::new(store),
        };
        let purged = tree.purge_incomplete()?;
        if purged > 0 {
            info!(purged, "removed records of interrupted uploads");
        }
        Ok(tree)
    }

    /// Read-only view of the root directory.
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Depth-first search for a file record and its parent directory.
    pub fn find_file(&self, file_id: &str) -> Option<(&Directory, &FileRecord)> {
        self.root.find_file(file_id)
    }

    /// Looks up the directory at `path` without creating anything.
    pub fn find_dir(&self, path: &DirPath) -> Option<&Directory> {
        path.below_root()
            .iter()
            .try_fold(&self.root, |dir, name| dir.find_subdir(name))
    }

    /// Appends `record` to the directory at `path`, creating missing
    /// intermediate directories.
    pub fn register_file(&mut self, path: &DirPath, record: FileRecord) -> Result<(), TreeError> {
        debug!(file_id = %record.file_id, path = %path, "registering file");
        self.root.ensure_path(path.below_root()).files.push(record);
        self.persist()
    }

    /// Deletes the record wherever it is.
    pub fn remove_file(&mut self, file_id: &str) -> Result<bool, TreeError> {
        if self.root.take_file(file_id).is_none() {
            return Ok(false);
        }
        debug!(file_id, "file record removed");
        self.persist()?;
        Ok(true)
    }

    /// Moves a record to the directory at `path`, creating it if needed.
    ///
    /// The record is detached from its old parent before it is inserted,
    /// so it is never listed twice.
    pub fn move_file(&mut self, file_id: &str, path: &DirPath) -> Result<bool, TreeError> {
        let Some(record) = self.root.take_file(file_id) else {
            return Ok(false);
        };
        self.root.ensure_path(path.below_root()).files.push(record);
        debug!(file_id, path = %path, "file moved");
        self.persist()?;
        Ok(true)
    }

    /// Removes the first descendant directory named `name` (pre-order).
    ///
    /// The root itself never matches.
    pub fn delete_dir(&mut self, name: &str) -> Result<bool, TreeError> {
        if !self.root.remove_descendant(name) {
            return Ok(false);
        }
        debug!(name, "directory removed");
        self.persist()?;
        Ok(true)
    }

    /// Clears the in-process flag once every chunk has been acknowledged.
    pub fn finalize_upload(&mut self, file_id: &str) -> Result<bool, TreeError> {
        let Some(record) = self.root.find_file_mut(file_id) else {
            return Ok(false);
        };
        record.in_process = false;
        self.persist()?;
        Ok(true)
    }

    /// Removes every record still flagged in-process. Returns how many.
    pub fn purge_incomplete(&mut self) -> Result<usize, TreeError> {
        let removed = self.root.purge_incomplete();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    fn persist(&self) -> Result<(), TreeError> {
        self.store.save(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{JsonFileStore, MemoryStore};

    fn done(id: &str) -> FileRecord {
        FileRecord {
            in_process: false,
            ..FileRecord::in_process(id.into(), format!("{id}.dat"), 2)
        }
    }

    fn empty_tree() -> (MetadataTree, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let tree = MetadataTree::load(Arc::clone(&store)).unwrap();
        (tree, store)
    }

    fn locations(tree: &MetadataTree, id: &str) -> usize {
        fn count(dir: &Directory, id: &str) -> usize {
            dir.files.iter().filter(|f| f.file_id == id).count()
                + dir.subdirs.iter().map(|d| count(d, id)).sum::<usize>()
        }
        count(tree.root(), id)
    }

    #[test]
    fn load_purges_in_process_records() {
        let mut stored = Directory::root();
        stored.files.push(done("KEEP0001"));
        stored
            .files
            .push(FileRecord::in_process("LOST0001".into(), "lost".into(), 3));
        let store = Arc::new(MemoryStore::with_tree(stored));

        let tree = MetadataTree::load(Arc::clone(&store)).unwrap();
        assert!(tree.find_file("KEEP0001").is_some());
        assert!(tree.find_file("LOST0001").is_none());
        // Purge is flushed before first use.
        assert!(store.snapshot().unwrap().find_file("LOST0001").is_none());
    }

    #[test]
    fn register_creates_intermediate_directories() {
        let (mut tree, store) = empty_tree();
        tree.register_file(&DirPath::parse("a/b/c"), done("FILE0001"))
            .unwrap();

        let dir = tree.find_dir(&DirPath::parse("a/b/c")).unwrap();
        assert_eq!(dir.files.len(), 1);
        let (parent, _) = tree.find_file("FILE0001").unwrap();
        assert_eq!(parent.name, "c");
        assert!(store.snapshot().unwrap().find_file("FILE0001").is_some());
    }

    #[test]
    fn remove_unknown_file_is_noop() {
        let (mut tree, store) = empty_tree();
        let saves = store.save_count();
        assert!(!tree.remove_file("NOPE0000").unwrap());
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn remove_file_persists() {
        let (mut tree, store) = empty_tree();
        tree.register_file(&DirPath::parse("x"), done("FILE0001"))
            .unwrap();
        assert!(tree.remove_file("FILE0001").unwrap());
        assert!(store.snapshot().unwrap().find_file("FILE0001").is_none());
    }

    #[test]
    fn move_keeps_exactly_one_location() {
        let (mut tree, _store) = empty_tree();
        tree.register_file(&DirPath::parse("src"), done("FILE0001"))
            .unwrap();
        assert_eq!(locations(&tree, "FILE0001"), 1);

        assert!(tree.move_file("FILE0001", &DirPath::parse("dst/deep")).unwrap());
        assert_eq!(locations(&tree, "FILE0001"), 1);
        let (parent, _) = tree.find_file("FILE0001").unwrap();
        assert_eq!(parent.name, "deep");
        assert!(tree.find_dir(&DirPath::parse("src")).unwrap().files.is_empty());

        // Moving into the same directory is still a single entry.
        assert!(tree.move_file("FILE0001", &DirPath::parse("dst/deep")).unwrap());
        assert_eq!(locations(&tree, "FILE0001"), 1);
    }

    #[test]
    fn move_unknown_file_creates_nothing() {
        let (mut tree, _store) = empty_tree();
        assert!(!tree.move_file("NOPE0000", &DirPath::parse("new")).unwrap());
        assert!(tree.find_dir(&DirPath::parse("new")).is_none());
    }

    #[test]
    fn delete_root_is_noop() {
        let (mut tree, _store) = empty_tree();
        tree.register_file(&DirPath::root(), done("FILE0001"))
            .unwrap();
        for name in ["root", "ROOT", "", "missing"] {
            assert!(!tree.delete_dir(name).unwrap());
        }
        assert_eq!(tree.root().name, "root");
        assert!(tree.find_file("FILE0001").is_some());
    }

    #[test]
    fn delete_dir_drops_contents() {
        let (mut tree, _store) = empty_tree();
        tree.register_file(&DirPath::parse("old/inner"), done("FILE0001"))
            .unwrap();
        assert!(tree.delete_dir("old").unwrap());
        assert!(tree.find_file("FILE0001").is_none());
    }

    #[test]
    fn finalize_clears_flag() {
        let (mut tree, store) = empty_tree();
        tree.register_file(
            &DirPath::root(),
            FileRecord::in_process("UPLD0001".into(), "up".into(), 3),
        )
        .unwrap();
        assert!(tree.finalize_upload("UPLD0001").unwrap());
        assert!(!tree.find_file("UPLD0001").unwrap().1.in_process);
        assert!(!store.snapshot().unwrap().find_file("UPLD0001").unwrap().1.in_process);
        assert!(!tree.finalize_upload("GONE0001").unwrap());
    }

    #[test]
    fn purge_twice_equals_purge_once() {
        let (mut tree, _store) = empty_tree();
        tree.register_file(&DirPath::parse("a"), done("KEEP0001"))
            .unwrap();
        tree.register_file(
            &DirPath::parse("a/b"),
            FileRecord::in_process("LOST0001".into(), "lost".into(), 1),
        )
        .unwrap();

        assert_eq!(tree.purge_incomplete().unwrap(), 1);
        let once = tree.root().clone();
        assert_eq!(tree.purge_incomplete().unwrap(), 0);
        assert_eq!(tree.root(), &once);
    }

    #[test]
    fn survives_restart_through_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tree.json");
        {
            let mut tree = MetadataTree::load(JsonFileStore::new(&path)).unwrap();
            tree.register_file(&DirPath::parse("docs"), done("KEEP0001"))
                .unwrap();
            tree.register_file(
                &DirPath::parse("docs"),
                FileRecord::in_process("LOST0001".into(), "lost".into(), 2),
            )
            .unwrap();
        }

        let tree = MetadataTree::load(JsonFileStore::new(&path)).unwrap();
        assert!(tree.find_file("KEEP0001").is_some());
        assert!(tree.find_file("LOST0001").is_none());
    }
}
