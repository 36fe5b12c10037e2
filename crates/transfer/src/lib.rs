//! Chunked file transfer: splitting, reassembly and progress tracking.

mod chunked;
mod progress;
mod size;
mod types;
mod validation;

pub use chunked::{ChunkReader, chunk_count, join, split, write_joined};
pub use progress::{EtaEstimator, ProgressCallback, ProgressEntry, ProgressTable};
pub use size::{ChunkSize, ConfigRangeError, DEFAULT_CHUNK_MIB, MAX_CHUNK_MIB, MIN_CHUNK_MIB};
pub use types::{Chunk, TaskId, TransferKind};
pub use validation::validate_file_name;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("incomplete transfer: missing chunks {missing:?} of {total}")]
    Incomplete { missing: Vec<u32>, total: u32 },

    #[error("invalid file name: {0}")]
    InvalidName(String),
}
