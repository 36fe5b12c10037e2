//! Remote blob transport.
//!
//! Chunks are stored as message attachments in a chat channel. Each
//! message carries a text tag (`FILEID:<id> CHUNK:<index>`) and exactly one
//! attachment. The [`BlobTransport`] trait is what the engine depends on;
//! [`DiscordTransport`] implements it over HTTP.

pub mod credential;
pub mod discord;
pub mod tag;
pub mod types;

pub use credential::Credential;
pub use discord::DiscordTransport;
pub use tag::ChunkTag;
pub use types::{Attachment, RemoteMessage};

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by transport operations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Errors from transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid credential")]
    InvalidCredential,

    #[error("{0}")]
    Other(String),
}

/// Post/list/fetch primitives the transfer engine is built on.
///
/// Implementations must be safe to call concurrently from many workers,
/// each with its own credential.
pub trait BlobTransport: Send + Sync {
    /// Posts `tag` as message text with `blob` attached as `blob_name`.
    fn post<'a>(
        &'a self,
        credential: &'a Credential,
        tag: &'a ChunkTag,
        blob: Vec<u8>,
        blob_name: &'a str,
    ) -> TransportFuture<'a, ()>;

    /// Lists up to `max_count` of the most recent messages visible to
    /// `credential`, newest first.
    fn list_recent<'a>(
        &'a self,
        credential: &'a Credential,
        max_count: u32,
    ) -> TransportFuture<'a, Vec<RemoteMessage>>;

    /// Downloads an attachment.
    fn fetch<'a>(&'a self, credential: &'a Credential, url: &'a str)
    -> TransportFuture<'a, Vec<u8>>;
}
