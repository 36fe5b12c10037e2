//! Chunked transfer engine.
//!
//! This crate implements the **transfer logic** for storing files as
//! tagged attachments on a remote message channel. It has no UI and no
//! concrete transport: callers hand it a [`BlobTransport`] and a
//! [`MetadataTree`] and drive it through [`Engine`].
//!
//! # Pipeline
//!
//! 1. **Upload**: register an in-process record, split the file, enqueue
//!    one task per chunk with round-robin credentials
//! 2. **Workers**: a fixed pool pulls tasks from a shared FIFO queue and
//!    posts chunks concurrently, in any order
//! 3. **Finalize**: the last acknowledged chunk clears the record's
//!    in-process flag
//! 4. **Download**: scan recent history for tagged chunks within a
//!    bounded number of attempts, then join and write the file
//!
//! [`BlobTransport`]: drivecord_transport::BlobTransport
//! [`MetadataTree`]: drivecord_tree::MetadataTree

pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;

mod context;
mod download;
mod queue;
mod task;
mod upload;
mod worker;

#[cfg(test)]
mod testing;

pub use config::{EngineConfig, PoolConfig, RetrievalPolicy};
pub use credentials::CredentialRing;
pub use engine::Engine;
pub use error::EngineError;

pub use drivecord_transfer::{ProgressEntry, ProgressTable, TaskId, TransferKind};
