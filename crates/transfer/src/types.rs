use std::fmt;

/// One contiguous slice of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position within the file.
    pub index: u32,
    /// Raw chunk data, never longer than the configured chunk size.
    pub data: Vec<u8>,
}

/// Kind of work a progress entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransferKind {
    /// Aggregate over all chunk uploads of one file.
    FileUpload,
    /// A single chunk upload.
    ChunkUpload,
    /// A whole-file download.
    Download,
}

impl TransferKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferKind::FileUpload => "upload",
            TransferKind::ChunkUpload => "chunk",
            TransferKind::Download => "download",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a task or aggregate in the progress table.
///
/// Sequence numbers are unique per table regardless of kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    pub seq: u64,
    pub kind: TransferKind,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.seq)
    }
}
