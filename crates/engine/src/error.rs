//! Engine error types.

use std::path::PathBuf;

use drivecord_transfer::TransferError;
use drivecord_transport::TransportError;
use drivecord_tree::TreeError;

/// Errors produced by the transfer engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("no credential available")]
    NoCredential,

    #[error("chunk {index} failed: {source}")]
    ChunkFailed {
        index: u32,
        #[source]
        source: TransportError,
    },

    #[error("incomplete transfer of {file_id}: {collected}/{total} chunks")]
    Incomplete {
        file_id: String,
        collected: u32,
        total: u32,
    },

    #[error("metadata error: {0}")]
    Tree(#[from] TreeError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine is shutting down")]
    ShuttingDown,
}

impl EngineError {
    /// Short status line shown in the progress table for a failed task.
    pub fn status(&self) -> String {
        match self {
            EngineError::NotFound(_) => "File not found".into(),
            EngineError::NoCredential => "No credential".into(),
            EngineError::ChunkFailed { index, .. } => format!("Chunk {index} fail"),
            EngineError::Incomplete { .. } => "Download incomplete".into(),
            EngineError::Transfer(e) => format!("Write failed: {e}"),
            EngineError::Io(e) => format!("Write failed: {e}"),
            other => other.to_string(),
        }
    }
}
