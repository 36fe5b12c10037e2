//! Executable tasks.
//!
//! Only chunk uploads and downloads are queued. The per-file upload
//! aggregate lives in the progress table as [`TransferKind::FileUpload`]
//! and is never executed itself.
//!
//! [`TransferKind::FileUpload`]: drivecord_transfer::TransferKind::FileUpload

use drivecord_transfer::TaskId;
use drivecord_transport::Credential;

/// Work item pulled by a worker.
#[derive(Debug)]
pub(crate) enum Task {
    ChunkUpload(ChunkUploadTask),
    Download(DownloadTask),
}

/// Posts one chunk of one file.
#[derive(Debug)]
pub(crate) struct ChunkUploadTask {
    pub file_id: String,
    pub index: u32,
    pub data: Vec<u8>,
    /// Attachment name, `<file name>.part<index>`.
    pub part_name: String,
    /// Progress entry of the whole-file upload this chunk counts toward.
    pub aggregate: TaskId,
    /// Picked round-robin at enqueue time; `None` when no credentials are
    /// configured.
    pub credential: Option<Credential>,
}

/// Rebuilds one file from channel history.
#[derive(Debug)]
pub(crate) struct DownloadTask {
    pub file_id: String,
}

/// Attachment name for chunk `index` of `file_name`.
pub(crate) fn part_name(file_name: &str, index: u32) -> String {
    format!("{file_name}.part{index}")
}
