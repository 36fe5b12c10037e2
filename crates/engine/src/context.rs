use std::sync::{Arc, Mutex, MutexGuard};

use drivecord_transfer::ProgressTable;
use drivecord_transport::BlobTransport;
use drivecord_tree::MetadataTree;

use crate::{CredentialRing, EngineConfig};

/// State shared by the engine and every worker.
///
/// Lock order is progress table first, then tree. Neither lock is held
/// across an await.
pub(crate) struct EngineContext {
    pub tree: Mutex<MetadataTree>,
    pub progress: ProgressTable,
    pub transport: Arc<dyn BlobTransport>,
    pub credentials: CredentialRing,
    pub config: EngineConfig,
}

impl EngineContext {
    pub fn lock_tree(&self) -> MutexGuard<'_, MetadataTree> {
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }
}
