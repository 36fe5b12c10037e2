use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the top-level directory. The root is never deleted.
pub const ROOT_NAME: &str = "root";

/// Metadata for one logical file spread over remote chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: String,
    pub file_name: String,
    pub chunk_count: u32,
    pub upload_date: DateTime<Utc>,
    /// Set from registration until the last chunk is acknowledged.
    #[serde(default)]
    pub in_process: bool,
}

impl FileRecord {
    /// Creates a record for an upload that is about to start.
    pub fn in_process(file_id: String, file_name: String, chunk_count: u32) -> Self {
        Self {
            file_id,
            file_name,
            chunk_count: chunk_count.max(1),
            upload_date: Utc::now(),
            in_process: true,
        }
    }
}

/// A directory node. Owns its children by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    pub name: String,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub subdirs: Vec<Directory>,
    /// Display state only.
    #[serde(default)]
    pub expanded: bool,
}

impl Default for Directory {
    fn default() -> Self {
        Self::root()
    }
}

impl Directory {
    /// Creates an empty, expanded root directory.
    pub fn root() -> Self {
        Self {
            expanded: true,
            ..Self::new(ROOT_NAME)
        }
    }

    /// Creates an empty, collapsed directory.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: Vec::new(),
            subdirs: Vec::new(),
            expanded: false,
        }
    }

    /// Direct-child lookup by name.
    pub fn find_subdir(&self, name: &str) -> Option<&Directory> {
        self.subdirs.iter().find(|d| d.name == name)
    }

    /// Depth-first search for a file, returning it with its parent.
    pub fn find_file(&self, file_id: &str) -> Option<(&Directory, &FileRecord)> {
        if let Some(file) = self.files.iter().find(|f| f.file_id == file_id) {
            return Some((self, file));
        }
        self.subdirs.iter().find_map(|d| d.find_file(file_id))
    }

    pub(crate) fn find_file_mut(&mut self, file_id: &str) -> Option<&mut FileRecord> {
        if let Some(pos) = self.files.iter().position(|f| f.file_id == file_id) {
            return Some(&mut self.files[pos]);
        }
        self.subdirs
            .iter_mut()
            .find_map(|d| d.find_file_mut(file_id))
    }

    /// Walks `segments` below this directory, creating missing ones.
    pub(crate) fn ensure_path(&mut self, segments: &[String]) -> &mut Directory {
        let mut current = self;
        for name in segments {
            let pos = match current.subdirs.iter().position(|d| d.name == *name) {
                Some(pos) => pos,
                None => {
                    current.subdirs.push(Directory::new(name));
                    current.subdirs.len() - 1
                }
            };
            current = &mut current.subdirs[pos];
        }
        current
    }

    /// Detaches the first record with `file_id` found depth-first.
    pub(crate) fn take_file(&mut self, file_id: &str) -> Option<FileRecord> {
        if let Some(pos) = self.files.iter().position(|f| f.file_id == file_id) {
            return Some(self.files.remove(pos));
        }
        self.subdirs.iter_mut().find_map(|d| d.take_file(file_id))
    }

    /// Removes the first descendant directory called `name`, in pre-order.
    ///
    /// `self` is never matched, which is what keeps the root alive.
    pub(crate) fn remove_descendant(&mut self, name: &str) -> bool {
        for i in 0..self.subdirs.len() {
            if self.subdirs[i].name == name {
                self.subdirs.remove(i);
                return true;
            }
            if self.subdirs[i].remove_descendant(name) {
                return true;
            }
        }
        false
    }

    /// Drops every in-process record in this subtree. Returns how many.
    pub(crate) fn purge_incomplete(&mut self) -> usize {
        let before = self.files.len();
        self.files.retain(|f| !f.in_process);
        let mut removed = before - self.files.len();
        for sub in &mut self.subdirs {
            removed += sub.purge_incomplete();
        }
        removed
    }

    /// Renders the subtree as box-drawing lines.
    ///
    /// Collapsed directories hide their children unless `expand_all` is set.
    pub fn render_lines(&self, expand_all: bool) -> Vec<String> {
        let mut lines = Vec::new();
        self.render_into(&mut lines, "", true, expand_all);
        lines
    }

    fn render_into(&self, lines: &mut Vec<String>, indent: &str, is_last: bool, expand_all: bool) {
        let expanded = expand_all || self.expanded;
        let prefix = if is_last { "└── " } else { "├── " };
        let marker = if expanded { "[-]" } else { "[+]" };
        lines.push(format!("{indent}{prefix}{marker} {}", self.name));
        if !expanded {
            return;
        }

        let child_indent = format!("{indent}{}", if is_last { "    " } else { "│   " });
        let total = self.subdirs.len() + self.files.len();
        for (idx, sub) in self.subdirs.iter().enumerate() {
            sub.render_into(lines, &child_indent, idx + 1 == total, expand_all);
        }
        for (offset, file) in self.files.iter().enumerate() {
            let last = self.subdirs.len() + offset + 1 == total;
            let prefix = if last { "└── " } else { "├── " };
            lines.push(format!(
                "{child_indent}{prefix}{} [ID={}]",
                file.file_name, file.file_id
            ));
        }
    }
}
