//! Engine façade: owns the queue, the pool and the shared state.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drivecord_transfer::{ProgressEntry, ProgressTable, TaskId, TransferKind};
use drivecord_transport::{BlobTransport, Credential};
use drivecord_tree::{DirPath, MetadataTree, TreeError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::context::EngineContext;
use crate::download::STATUS_DOWNLOADING;
use crate::queue::TaskQueue;
use crate::task::{DownloadTask, Task};
use crate::worker::WorkerPool;
use crate::{CredentialRing, EngineConfig, EngineError, upload};

/// How often [`Engine::wait_for`] re-reads the progress table.
const WAIT_POLL: Duration = Duration::from_millis(20);

/// Transfer engine.
///
/// Create with [`Engine::new`], call [`start`](Self::start) from inside a
/// tokio runtime, then queue work. [`shutdown`](Self::shutdown) stops the
/// workers and drops records of uploads that did not finish.
pub struct Engine {
    ctx: Arc<EngineContext>,
    queue: TaskQueue,
    cancel: CancellationToken,
    pool: Mutex<Option<WorkerPool>>,
}

impl Engine {
    pub fn new(
        tree: MetadataTree,
        transport: Arc<dyn BlobTransport>,
        credentials: Vec<Credential>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(EngineContext {
                tree: Mutex::new(tree),
                progress: ProgressTable::new(),
                transport,
                credentials: CredentialRing::new(credentials),
                config,
            }),
            queue: TaskQueue::new(),
            cancel: CancellationToken::new(),
            pool: Mutex::new(None),
        }
    }

    /// Spawns the worker pool. Calling it again while running is a no-op.
    pub fn start(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::ShuttingDown);
        }
        let mut pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        if pool.is_some() {
            return Ok(());
        }

        let count = self
            .ctx
            .config
            .pool
            .worker_count(self.ctx.credentials.len());
        if self.ctx.credentials.is_empty() {
            warn!("no credentials configured; transfers will fail");
        }
        *pool = Some(WorkerPool::spawn(
            Arc::clone(&self.ctx),
            self.queue.receiver(),
            count,
            self.cancel.clone(),
        ));
        info!(workers = count, "engine started");
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            Err(EngineError::ShuttingDown)
        } else {
            Ok(())
        }
    }

    /// Splits `source` into chunks and queues them for upload into `dir`.
    ///
    /// Returns the id of the whole-file progress entry.
    pub fn queue_upload(&self, source: &Path, dir: &DirPath) -> Result<TaskId, EngineError> {
        self.ensure_running()?;
        upload::queue_upload(&self.ctx, &self.queue, source, dir)
    }

    /// Queues a download of `file_id` into the configured download folder.
    pub fn queue_download(&self, file_id: &str) -> Result<TaskId, EngineError> {
        self.ensure_running()?;
        let (file_name, total) = {
            let tree = self.ctx.lock_tree();
            let (_, record) = tree
                .find_file(file_id)
                .ok_or_else(|| EngineError::NotFound(file_id.to_string()))?;
            (record.file_name.clone(), record.chunk_count)
        };

        let id = self.ctx.progress.insert(
            TransferKind::Download,
            file_id,
            &file_name,
            total,
            STATUS_DOWNLOADING,
        );
        self.queue.push(
            id,
            Task::Download(DownloadTask {
                file_id: file_id.to_string(),
            }),
        )?;
        info!(file_id, file = %file_name, "download queued");
        Ok(id)
    }

    /// Moves a file record to `dir`, creating it if needed.
    pub fn move_file(&self, file_id: &str, dir: &DirPath) -> Result<bool, TreeError> {
        self.ctx.lock_tree().move_file(file_id, dir)
    }

    /// Deletes a file record. Remote chunks are left in place.
    pub fn remove_file(&self, file_id: &str) -> Result<bool, TreeError> {
        self.ctx.lock_tree().remove_file(file_id)
    }

    /// Deletes the first directory named `name` and everything under it.
    pub fn delete_dir(&self, name: &str) -> Result<bool, TreeError> {
        self.ctx.lock_tree().delete_dir(name)
    }

    /// Runs `f` against the current tree.
    pub fn with_tree<R>(&self, f: impl FnOnce(&MetadataTree) -> R) -> R {
        f(&self.ctx.lock_tree())
    }

    /// Live progress table; register callbacks with
    /// [`ProgressTable::on_change`].
    pub fn progress(&self) -> &ProgressTable {
        &self.ctx.progress
    }

    pub fn progress_snapshot(&self) -> Vec<(TaskId, ProgressEntry)> {
        self.ctx.progress.snapshot()
    }

    pub fn prune_finished(&self) -> usize {
        self.ctx.progress.prune_finished()
    }

    /// Waits until the entry is finished and returns its final state.
    ///
    /// Returns `None` if the entry does not exist or was pruned.
    pub async fn wait_for(&self, id: &TaskId) -> Option<ProgressEntry> {
        loop {
            let entry = self.ctx.progress.get(id)?;
            if entry.finished {
                return Some(entry);
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    /// Stops the workers, then removes records of uploads whose chunks did
    /// not all arrive, whether or not their progress entries were pruned.
    /// Returns how many records were removed.
    pub async fn shutdown(&self) -> usize {
        self.cancel.cancel();
        let pool = self
            .pool
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(pool) = pool {
            pool.stop(self.ctx.config.pool.shutdown_grace).await;
        }

        // With the workers gone, every record still in process belongs to
        // an upload that will never finish.
        let purged = match self.ctx.lock_tree().purge_incomplete() {
            Ok(purged) => purged,
            Err(e) => {
                error!(error = %e, "failed to purge unfinished uploads");
                0
            }
        };
        info!(purged, "engine stopped");
        purged
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use drivecord_transfer::ChunkSize;
    use drivecord_tree::{FileRecord, MemoryStore};
    use tempfile::TempDir;

    use super::*;
    use crate::testing::FakeTransport;
    use crate::{PoolConfig, RetrievalPolicy};

    const MIB: usize = 1024 * 1024;

    struct Harness {
        engine: Engine,
        fake: Arc<FakeTransport>,
        store: Arc<MemoryStore>,
        dir: TempDir,
    }

    impl Harness {
        fn new(tokens: &[&str]) -> Self {
            Self::build(tokens, |_| {}, true)
        }

        fn with_tree(tokens: &[&str], seed: impl FnOnce(&mut MetadataTree)) -> Self {
            Self::build(tokens, seed, true)
        }

        fn build(tokens: &[&str], seed: impl FnOnce(&mut MetadataTree), start: bool) -> Self {
            let dir = TempDir::new().unwrap();
            let store = Arc::new(MemoryStore::new());
            let mut tree = MetadataTree::load(Arc::clone(&store)).unwrap();
            seed(&mut tree);

            let fake = Arc::new(FakeTransport::new());
            let config = EngineConfig {
                chunk_size: ChunkSize::default(),
                download_dir: dir.path().join("downloads"),
                pool: PoolConfig {
                    shutdown_grace: Duration::from_secs(5),
                    ..PoolConfig::default()
                },
                retrieval: RetrievalPolicy {
                    poll_delay: Duration::ZERO,
                    ..RetrievalPolicy::default()
                },
            };
            let engine = Engine::new(
                tree,
                Arc::clone(&fake) as Arc<dyn BlobTransport>,
                tokens.iter().map(|t| Credential::new(*t)).collect(),
                config,
            );
            if start {
                engine.start().unwrap();
            }
            Self {
                engine,
                fake,
                store,
                dir,
            }
        }

        fn write_source(&self, name: &str, len: usize) -> (PathBuf, Vec<u8>) {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let path = self.dir.path().join(name);
            std::fs::write(&path, &data).unwrap();
            (path, data)
        }

        fn download_path(&self, name: &str) -> PathBuf {
            self.dir.path().join("downloads").join(name)
        }

        fn record(&self, file_id: &str) -> Option<FileRecord> {
            self.engine
                .with_tree(|t| t.find_file(file_id).map(|(_, r)| r.clone()))
        }

        async fn finish(&self, id: &TaskId) -> ProgressEntry {
            tokio::time::timeout(Duration::from_secs(30), self.engine.wait_for(id))
                .await
                .expect("task did not finish")
                .expect("progress entry missing")
        }

        /// Waits until every entry, chunks included, is finished.
        async fn drain(&self) {
            tokio::time::timeout(Duration::from_secs(30), async {
                while self
                    .engine
                    .progress_snapshot()
                    .iter()
                    .any(|(_, e)| !e.finished)
                {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .expect("tasks did not settle");
        }
    }

    fn register(tree: &mut MetadataTree, file_id: &str, name: &str, chunks: u32) {
        let mut record = FileRecord::in_process(file_id.into(), name.into(), chunks);
        record.in_process = false;
        tree.register_file(&DirPath::root(), record).unwrap();
    }

    // -- uploads -------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn twelve_mib_upload_completes_in_three_chunks() {
        let h = Harness::new(&["tok-a", "tok-b"]);
        let (src, _) = h.write_source("big.bin", 12 * MIB);

        let id = h
            .engine
            .queue_upload(&src, &DirPath::parse("root/docs"))
            .unwrap();
        let agg = h.finish(&id).await;

        assert_eq!(agg.status, "Upload complete");
        assert_eq!((agg.progress, agg.total, agg.failed), (3, 3, 0));

        let record = h.record(&agg.file_id).unwrap();
        assert_eq!(record.chunk_count, 3);
        assert!(!record.in_process);

        let saved = h.store.snapshot().unwrap();
        let (parent, stored) = saved.find_file(&agg.file_id).unwrap();
        assert_eq!(parent.name, "docs");
        assert!(!stored.in_process);

        let mut names: Vec<String> = h.fake.posts().into_iter().map(|p| p.blob_name).collect();
        names.sort();
        assert_eq!(names, ["big.bin.part0", "big.bin.part1", "big.bin.part2"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn zero_byte_upload_is_one_chunk() {
        let h = Harness::new(&["tok"]);
        let (src, _) = h.write_source("empty.txt", 0);

        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let agg = h.finish(&id).await;

        assert_eq!(agg.status, "Upload complete");
        assert_eq!(agg.total, 1);
        assert_eq!(h.record(&agg.file_id).unwrap().chunk_count, 1);
        assert_eq!(h.fake.posts().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_chunk_posted_exactly_once_across_credentials() {
        let h = Harness::new(&["a", "b", "c"]);
        let (src, _) = h.write_source("big.bin", 22 * MIB);

        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let agg = h.finish(&id).await;
        assert_eq!(agg.status, "Upload complete");

        let posts = h.fake.posts();
        let mut indices: Vec<u32> = posts.iter().map(|p| p.tag.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, [0, 1, 2, 3, 4]);
        assert!(posts.iter().all(|p| p.tag.file_id == agg.file_id));

        let mut per_credential: HashMap<&str, usize> = HashMap::new();
        for p in &posts {
            *per_credential.entry(p.credential.as_str()).or_default() += 1;
        }
        // 5 chunks round-robin over 3 credentials.
        assert_eq!(per_credential["a"], 2);
        assert_eq!(per_credential["b"], 2);
        assert_eq!(per_credential["c"], 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failed_chunk_leaves_aggregate_short() {
        let h = Harness::new(&["tok-a", "tok-b"]);
        h.fake.fail_chunk(1);
        let (src, _) = h.write_source("big.bin", 12 * MIB);

        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let agg = h.finish(&id).await;
        h.drain().await;

        assert_eq!((agg.progress, agg.total, agg.failed), (2, 3, 1));
        assert!(!agg.is_complete());
        assert!(agg.status.starts_with("Upload failed"));
        assert!(h.record(&agg.file_id).unwrap().in_process);

        let chunks = h.engine.progress().by_kind(TransferKind::ChunkUpload);
        let statuses: Vec<&str> = chunks.iter().map(|(_, e)| e.status.as_str()).collect();
        assert!(statuses.contains(&"Chunk 1 fail"));
        assert!(statuses.contains(&"Chunk 0 done"));
        assert!(chunks.iter().all(|(_, e)| e.finished));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panicking_chunk_counts_as_failed() {
        let h = Harness::new(&["tok"]);
        h.fake.panic_chunk(0);
        let (src, _) = h.write_source("boom.bin", 10);

        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let agg = h.finish(&id).await;
        h.drain().await;

        assert_eq!((agg.progress, agg.total, agg.failed), (0, 1, 1));
        assert_eq!(agg.status, "Upload failed: 1 of 1 chunks");
        let chunks = h.engine.progress().by_kind(TransferKind::ChunkUpload);
        assert!(chunks[0].1.status.starts_with("Task aborted"));

        // The worker survived the panic and still serves the queue.
        let (ok, _) = h.write_source("ok.bin", 10);
        let next = h.engine.queue_upload(&ok, &DirPath::root()).unwrap();
        assert_eq!(h.finish(&next).await.status, "Upload complete");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn upload_without_credentials_fails_every_chunk() {
        let h = Harness::new(&[]);
        let (src, _) = h.write_source("note.txt", 10);

        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let agg = h.finish(&id).await;
        h.drain().await;

        assert_eq!((agg.progress, agg.failed), (0, 1));
        let chunks = h.engine.progress().by_kind(TransferKind::ChunkUpload);
        assert_eq!(chunks[0].1.status, "No credential");
        assert!(h.fake.posts().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn upload_of_missing_source_is_rejected() {
        let h = Harness::new(&["tok"]);
        let missing = h.dir.path().join("nope.bin");
        let err = h.engine.queue_upload(&missing, &DirPath::root()).unwrap_err();
        assert!(matches!(err, EngineError::NotAFile(_)));
        assert!(h.engine.progress().is_empty());
    }

    // -- downloads -----------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn upload_then_download_round_trips() {
        let h = Harness::new(&["tok-a", "tok-b"]);
        let (src, data) = h.write_source("big.bin", 12 * MIB);

        let up = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let file_id = h.finish(&up).await.file_id;

        let down = h.engine.queue_download(&file_id).unwrap();
        let entry = h.finish(&down).await;

        let target = h.download_path("big.bin");
        assert_eq!(
            entry.status,
            format!("Download complete, file saved to: {}", target.display())
        );
        assert_eq!((entry.progress, entry.total), (3, 3));
        assert_eq!(std::fs::read(&target).unwrap(), data);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn download_ignores_foreign_and_malformed_messages() {
        let h = Harness::with_tree(&["tok"], |t| register(t, "FILE0001", "out.txt", 2));
        h.fake.seed_chunk("FILE0001", 1, b" world");
        h.fake.seed_chunk("FILE0001", 0, b"hello");
        h.fake.seed_chunk("OTHER001", 0, b"wrong file");
        h.fake.seed_chunk("FILE0001", 7, b"index out of range");
        h.fake
            .seed_message("FILEID:FILE0001 CHUNK:0", vec![b"a".to_vec(), b"b".to_vec()]);
        h.fake.seed_message("FILEID:FILE0001 CHUNK:1", vec![]);
        h.fake.seed_message("just chatting", vec![b"x".to_vec()]);

        let id = h.engine.queue_download("FILE0001").unwrap();
        let entry = h.finish(&id).await;

        assert!(entry.status.starts_with("Download complete"));
        assert_eq!(
            std::fs::read(h.download_path("out.txt")).unwrap(),
            b"hello world"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn missing_chunk_gives_up_after_attempt_budget() {
        let h = Harness::with_tree(&["tok"], |t| register(t, "FILE0001", "four.bin", 4));
        for index in 0..3 {
            h.fake.seed_chunk("FILE0001", index, &[index as u8; 8]);
        }

        let id = h.engine.queue_download("FILE0001").unwrap();
        let entry = h.finish(&id).await;

        assert_eq!(entry.status, "Download incomplete");
        assert_eq!((entry.progress, entry.total), (3, 4));
        assert_eq!(h.fake.list_calls(), 40);
        assert!(!h.download_path("four.bin").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn chunks_outside_history_window_are_not_found() {
        let h = Harness::with_tree(&["tok"], |t| register(t, "FILE0001", "old.bin", 1));
        h.fake.seed_chunk("FILE0001", 0, b"old");
        for n in 0..100 {
            h.fake.seed_message(&format!("chatter {n}"), vec![]);
        }

        let id = h.engine.queue_download("FILE0001").unwrap();
        assert_eq!(h.finish(&id).await.status, "Download incomplete");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn download_reports_eta_while_collecting() {
        let h = Harness::with_tree(&["tok"], |t| register(t, "FILE0001", "three.bin", 3));
        for index in 0..3 {
            h.fake.seed_chunk("FILE0001", index, &[index as u8; 8]);
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        h.engine.progress().on_change(Box::new(move |id, entry| {
            if id.kind == TransferKind::Download {
                sink.lock().unwrap().push(entry.status.clone());
            }
        }));

        let id = h.engine.queue_download("FILE0001").unwrap();
        assert!(h.finish(&id).await.status.starts_with("Download complete"));

        let seen = seen.lock().unwrap();
        let etas: Vec<&String> = seen
            .iter()
            .filter(|s| s.starts_with("Downloading... ETA: "))
            .collect();
        assert_eq!(etas.len(), 3);
        assert!(etas.iter().all(|s| s.ends_with('s')));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn download_without_credentials() {
        let h = Harness::with_tree(&[], |t| register(t, "FILE0001", "a.bin", 1));
        h.fake.seed_chunk("FILE0001", 0, b"a");

        let id = h.engine.queue_download("FILE0001").unwrap();
        assert_eq!(h.finish(&id).await.status, "No credential");
        assert_eq!(h.fake.list_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn download_of_unknown_id_is_rejected() {
        let h = Harness::new(&["tok"]);
        let err = h.engine.queue_download("NOPE0000").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(id) if id == "NOPE0000"));
        assert!(h.engine.progress().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn record_removed_before_download_runs() {
        let h = Harness::build(&["tok"], |t| register(t, "FILE0001", "a.bin", 1), false);
        h.fake.seed_chunk("FILE0001", 0, b"a");

        let id = h.engine.queue_download("FILE0001").unwrap();
        assert!(h.engine.remove_file("FILE0001").unwrap());
        h.engine.start().unwrap();

        assert_eq!(h.finish(&id).await.status, "File not found");
        assert_eq!(h.fake.list_calls(), 0);
    }

    // -- tree operations and shutdown ----------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tree_operations_go_through_engine() {
        let h = Harness::with_tree(&["tok"], |t| register(t, "FILE0001", "a.bin", 1));

        assert!(h.engine.move_file("FILE0001", &DirPath::parse("root/x/y")).unwrap());
        let parent = h
            .engine
            .with_tree(|t| t.find_file("FILE0001").map(|(d, _)| d.name.clone()));
        assert_eq!(parent.as_deref(), Some("y"));

        assert!(h.engine.delete_dir("x").unwrap());
        assert!(h.record("FILE0001").is_none());
        assert!(!h.engine.remove_file("FILE0001").unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shutdown_purges_failed_upload() {
        let h = Harness::new(&["tok"]);
        h.fake.fail_chunk(0);

        let (src, _) = h.write_source("lost.bin", 10);
        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let agg = h.finish(&id).await;
        assert!(!agg.is_complete());
        assert!(h.record(&agg.file_id).is_some());

        assert_eq!(h.engine.shutdown().await, 1);
        assert!(h.record(&agg.file_id).is_none());
        assert!(h.store.snapshot().unwrap().files.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn prune_then_shutdown_still_purges_failed_upload() {
        let h = Harness::new(&["tok"]);
        h.fake.fail_chunk(0);

        let (src, _) = h.write_source("lost.bin", 10);
        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let file_id = h.finish(&id).await.file_id;
        h.drain().await;

        assert_eq!(h.engine.prune_finished(), 2);
        assert!(h.record(&file_id).unwrap().in_process);

        assert_eq!(h.engine.shutdown().await, 1);
        assert!(h.record(&file_id).is_none());
        assert!(h.store.snapshot().unwrap().files.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shutdown_purges_uploads_that_never_ran() {
        let h = Harness::build(&["tok"], |_| {}, false);
        let (src, _) = h.write_source("queued.bin", 10);
        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let file_id = h.engine.progress().get(&id).unwrap().file_id;

        assert_eq!(h.engine.shutdown().await, 1);
        assert!(h.record(&file_id).is_none());
        assert!(h.fake.posts().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shutdown_keeps_completed_uploads() {
        let h = Harness::new(&["tok"]);
        let (src, _) = h.write_source("done.bin", 100);
        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        let file_id = h.finish(&id).await.file_id;

        assert_eq!(h.engine.shutdown().await, 0);
        assert!(h.record(&file_id).is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn queueing_after_shutdown_is_refused() {
        let h = Harness::with_tree(&["tok"], |t| register(t, "FILE0001", "a.bin", 1));
        h.engine.shutdown().await;

        assert!(matches!(
            h.engine.queue_download("FILE0001"),
            Err(EngineError::ShuttingDown)
        ));
        assert!(matches!(h.engine.start(), Err(EngineError::ShuttingDown)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn prune_drops_finished_entries() {
        let h = Harness::new(&["tok"]);
        let (src, _) = h.write_source("a.bin", 1);
        let id = h.engine.queue_upload(&src, &DirPath::root()).unwrap();
        h.finish(&id).await;
        h.drain().await;

        // aggregate plus one chunk entry
        assert_eq!(h.engine.prune_finished(), 2);
        assert!(h.engine.progress_snapshot().is_empty());
        assert!(h.engine.wait_for(&id).await.is_none());
    }
}
