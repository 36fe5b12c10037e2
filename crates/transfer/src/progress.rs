use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use crate::types::{TaskId, TransferKind};

/// Callback invoked with a copy of an entry after it changes.
pub type ProgressCallback = Box<dyn Fn(&TaskId, &ProgressEntry) + Send + Sync>;

/// Shared progress state for one task or one aggregate transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub kind: TransferKind,
    pub file_id: String,
    /// Source path for uploads, file id for downloads.
    pub label: String,
    pub progress: u32,
    pub total: u32,
    pub status: String,
    pub finished: bool,
    /// Chunk tasks that failed for this aggregate.
    pub failed: u32,
}

impl ProgressEntry {
    /// Returns `true` once every unit of work has been counted.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.progress >= self.total
    }

    /// Whole-number completion percentage.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (u64::from(self.progress) * 100 / u64::from(self.total)) as u32
    }
}

/// Table of progress entries shared by workers, orchestrators and readers.
///
/// One mutex guards every entry, so a read-modify-write done through
/// [`update`](Self::update) is atomic with respect to all other writers.
pub struct ProgressTable {
    inner: Mutex<TableInner>,
    callbacks: RwLock<Vec<ProgressCallback>>,
}

struct TableInner {
    entries: BTreeMap<TaskId, ProgressEntry>,
    next_seq: u64,
}

impl Default for ProgressTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TableInner {
                entries: BTreeMap::new(),
                next_seq: 1,
            }),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TableInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a change callback.
    pub fn on_change(&self, callback: ProgressCallback) {
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(callback);
    }

    fn notify(&self, id: &TaskId, entry: &ProgressEntry) {
        let callbacks = self.callbacks.read().unwrap_or_else(|e| e.into_inner());
        for cb in callbacks.iter() {
            cb(id, entry);
        }
    }

    /// Adds a new entry and returns its id.
    pub fn insert(
        &self,
        kind: TransferKind,
        file_id: &str,
        label: &str,
        total: u32,
        status: &str,
    ) -> TaskId {
        let entry = ProgressEntry {
            kind,
            file_id: file_id.to_string(),
            label: label.to_string(),
            progress: 0,
            total,
            status: status.to_string(),
            finished: false,
            failed: 0,
        };
        let id = {
            let mut inner = self.lock();
            let id = TaskId {
                seq: inner.next_seq,
                kind,
            };
            inner.next_seq += 1;
            inner.entries.insert(id, entry.clone());
            id
        };
        self.notify(&id, &entry);
        id
    }

    /// Runs `f` on the entry while holding the table lock.
    ///
    /// Anything `f` does, including work on other shared state, happens in
    /// the same critical section. Returns `None` if the entry is gone.
    pub fn update<R>(&self, id: &TaskId, f: impl FnOnce(&mut ProgressEntry) -> R) -> Option<R> {
        let (result, copy) = {
            let mut inner = self.lock();
            let entry = inner.entries.get_mut(id)?;
            let result = f(entry);
            (result, entry.clone())
        };
        self.notify(id, &copy);
        Some(result)
    }

    /// Replaces the status string.
    pub fn set_status(&self, id: &TaskId, status: impl Into<String>) {
        let status = status.into();
        self.update(id, |e| e.status = status);
    }

    /// Marks the entry finished, whatever its outcome.
    pub fn mark_finished(&self, id: &TaskId) {
        self.update(id, |e| e.finished = true);
    }

    /// Returns a copy of one entry.
    pub fn get(&self, id: &TaskId) -> Option<ProgressEntry> {
        self.lock().entries.get(id).cloned()
    }

    /// Copies of all entries, oldest first.
    pub fn snapshot(&self) -> Vec<(TaskId, ProgressEntry)> {
        self.lock()
            .entries
            .iter()
            .map(|(id, e)| (*id, e.clone()))
            .collect()
    }

    /// Entries of the given kind, oldest first.
    pub fn by_kind(&self, kind: TransferKind) -> Vec<(TaskId, ProgressEntry)> {
        self.lock()
            .entries
            .iter()
            .filter(|(id, _)| id.kind == kind)
            .map(|(id, e)| (*id, e.clone()))
            .collect()
    }

    /// Drops finished entries. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| !e.finished);
        before - inner.entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// EtaEstimator
// ---------------------------------------------------------------------------

/// Estimates remaining time from the average time per completed unit.
pub struct EtaEstimator {
    started: Instant,
}

impl Default for EtaEstimator {
    fn default() -> Self {
        Self::start()
    }
}

impl EtaEstimator {
    /// Starts the clock now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Time left for `total - done` units at the average rate so far.
    ///
    /// Returns `None` until at least one unit is done.
    pub fn eta(&self, done: u32, total: u32) -> Option<Duration> {
        self.eta_at(self.started.elapsed(), done, total)
    }

    fn eta_at(&self, elapsed: Duration, done: u32, total: u32) -> Option<Duration> {
        if done == 0 {
            return None;
        }
        let remaining = total.saturating_sub(done);
        Some(elapsed.div_f64(f64::from(done)).mul_f64(f64::from(remaining)))
    }
}
