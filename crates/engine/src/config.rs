//! Engine tunables.

use std::path::PathBuf;
use std::time::Duration;

use drivecord_transfer::ChunkSize;

/// Default folder downloads are written to.
pub const DEFAULT_DOWNLOAD_DIR: &str = "Drivecord Downloads";

/// Worker pool sizing and polling.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on workers regardless of credential count.
    pub max_workers: usize,
    /// How long a worker waits on an empty queue before re-checking the
    /// stop signal.
    pub poll_timeout: Duration,
    /// How long shutdown waits for each worker to finish its task.
    pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            poll_timeout: Duration::from_millis(50),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

impl PoolConfig {
    /// One worker per credential, capped at `max_workers`, at least one.
    pub fn worker_count(&self, credentials: usize) -> usize {
        credentials.clamp(1, self.max_workers.max(1))
    }
}

/// Retry policy for rebuilding a file from channel history.
#[derive(Debug, Clone)]
pub struct RetrievalPolicy {
    /// History listings attempted before giving up.
    pub max_attempts: u32,
    /// Messages requested per listing.
    pub page_size: u32,
    /// Pause between listings.
    pub poll_delay: Duration,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 40,
            page_size: 100,
            poll_delay: Duration::from_millis(10),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub chunk_size: ChunkSize,
    pub download_dir: PathBuf,
    pub pool: PoolConfig,
    pub retrieval: RetrievalPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: ChunkSize::default(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            pool: PoolConfig::default(),
            retrieval: RetrievalPolicy::default(),
        }
    }
}
