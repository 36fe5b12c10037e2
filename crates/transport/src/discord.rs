//! HTTP transport backed by a Discord channel.
//!
//! Chunks are posted as bot messages with one attachment each. Requests
//! authenticate with `Authorization: Bot <token>`, one token per call, so
//! each credential hits its own rate-limit bucket.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::{debug, trace};

use crate::{BlobTransport, ChunkTag, Credential, RemoteMessage, TransportError, TransportFuture};

const DEFAULT_BASE_URL: &str = "https://discord.com/api/v9";

/// Largest page the history endpoint returns.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Per-request timeout; bounds every network suspension point.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Discord channel transport.
pub struct DiscordTransport {
    http: reqwest::Client,
    base_url: String,
    channel_id: String,
}

impl DiscordTransport {
    /// Creates a transport posting to `channel_id`.
    pub fn new(channel_id: &str) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            channel_id: channel_id.to_string(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/channels/{}/messages", self.base_url, self.channel_id)
    }

    fn auth(credential: &Credential) -> Result<HeaderValue, TransportError> {
        HeaderValue::from_str(&format!("Bot {}", credential.expose()))
            .map_err(|_| TransportError::InvalidCredential)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TransportError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn post_chunk(
        &self,
        credential: &Credential,
        tag: &ChunkTag,
        blob: Vec<u8>,
        blob_name: &str,
    ) -> Result<(), TransportError> {
        let size = blob.len();
        let part = Part::bytes(blob)
            .file_name(blob_name.to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("content", tag.to_string())
            .part("files[0]", part);

        let resp = self
            .http
            .post(self.messages_url())
            .header(AUTHORIZATION, Self::auth(credential)?)
            .multipart(form)
            .send()
            .await?;
        Self::check(resp).await?;

        debug!(tag = %tag, bytes = size, "chunk posted");
        Ok(())
    }

    async fn list_messages(
        &self,
        credential: &Credential,
        max_count: u32,
    ) -> Result<Vec<RemoteMessage>, TransportError> {
        let limit = max_count.clamp(1, MAX_PAGE_SIZE);
        let resp = self
            .http
            .get(self.messages_url())
            .query(&[("limit", limit.to_string())])
            .header(AUTHORIZATION, Self::auth(credential)?)
            .send()
            .await?;
        let body = Self::check(resp).await?.bytes().await?;
        let messages: Vec<RemoteMessage> = serde_json::from_slice(&body)?;

        trace!(count = messages.len(), "history page fetched");
        Ok(messages)
    }

    async fn download(&self, credential: &Credential, url: &str) -> Result<Vec<u8>, TransportError> {
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, Self::auth(credential)?)
            .send()
            .await?;
        Ok(Self::check(resp).await?.bytes().await?.to_vec())
    }
}

impl BlobTransport for DiscordTransport {
    fn post<'a>(
        &'a self,
        credential: &'a Credential,
        tag: &'a ChunkTag,
        blob: Vec<u8>,
        blob_name: &'a str,
    ) -> TransportFuture<'a, ()> {
        Box::pin(self.post_chunk(credential, tag, blob, blob_name))
    }

    fn list_recent<'a>(
        &'a self,
        credential: &'a Credential,
        max_count: u32,
    ) -> TransportFuture<'a, Vec<RemoteMessage>> {
        Box::pin(self.list_messages(credential, max_count))
    }

    fn fetch<'a>(
        &'a self,
        credential: &'a Credential,
        url: &'a str,
    ) -> TransportFuture<'a, Vec<u8>> {
        Box::pin(self.download(credential, url))
    }
}
