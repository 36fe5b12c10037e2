//! In-memory transport for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use drivecord_transport::{
    Attachment, BlobTransport, ChunkTag, Credential, RemoteMessage, TransportError,
    TransportFuture,
};

/// A channel kept in memory. Posted chunks become messages whose
/// attachment URL resolves through [`fetch`](BlobTransport::fetch).
#[derive(Default)]
pub(crate) struct FakeTransport {
    state: Mutex<FakeState>,
    list_calls: AtomicUsize,
}

#[derive(Default)]
struct FakeState {
    /// Oldest first.
    messages: Vec<RemoteMessage>,
    blobs: HashMap<String, Vec<u8>>,
    posts: Vec<Post>,
    failing: HashSet<u32>,
    panicking: HashSet<u32>,
}

#[derive(Debug, Clone)]
pub(crate) struct Post {
    pub credential: String,
    pub tag: ChunkTag,
    pub blob_name: String,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Every post of chunk `index` fails.
    pub fn fail_chunk(&self, index: u32) {
        self.state().failing.insert(index);
    }

    /// Posting chunk `index` panics inside the task.
    pub fn panic_chunk(&self, index: u32) {
        self.state().panicking.insert(index);
    }

    /// Adds a chunk message as if a previous upload had posted it.
    pub fn seed_chunk(&self, file_id: &str, index: u32, data: &[u8]) {
        let tag = ChunkTag::new(file_id, index);
        self.state().append(tag.to_string(), vec![data.to_vec()]);
    }

    /// Adds a message with arbitrary text and attachments.
    pub fn seed_message(&self, content: &str, attachments: Vec<Vec<u8>>) {
        self.state().append(content.to_string(), attachments);
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state().posts.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl FakeState {
    fn append(&mut self, content: String, attachments: Vec<Vec<u8>>) {
        let n = self.messages.len();
        let attachments = attachments
            .into_iter()
            .enumerate()
            .map(|(i, data)| {
                let url = format!("fake://attachments/{n}/{i}");
                self.blobs.insert(url.clone(), data);
                Attachment {
                    url,
                    filename: String::new(),
                }
            })
            .collect();
        self.messages.push(RemoteMessage {
            content,
            attachments,
        });
    }
}

impl BlobTransport for FakeTransport {
    fn post<'a>(
        &'a self,
        credential: &'a Credential,
        tag: &'a ChunkTag,
        blob: Vec<u8>,
        blob_name: &'a str,
    ) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let panics = self.state().panicking.contains(&tag.index);
            if panics {
                panic!("injected panic posting chunk {}", tag.index);
            }
            let mut state = self.state();
            if state.failing.contains(&tag.index) {
                return Err(TransportError::Api {
                    status: 500,
                    body: "injected failure".into(),
                });
            }
            state.posts.push(Post {
                credential: credential.expose().to_string(),
                tag: tag.clone(),
                blob_name: blob_name.to_string(),
            });
            state.append(tag.to_string(), vec![blob]);
            Ok(())
        })
    }

    fn list_recent<'a>(
        &'a self,
        _credential: &'a Credential,
        max_count: u32,
    ) -> TransportFuture<'a, Vec<RemoteMessage>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .state()
                .messages
                .iter()
                .rev()
                .take(max_count as usize)
                .cloned()
                .collect())
        })
    }

    fn fetch<'a>(&'a self, _credential: &'a Credential, url: &'a str) -> TransportFuture<'a, Vec<u8>> {
        Box::pin(async move {
            self.state()
                .blobs
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError::Api {
                    status: 404,
                    body: String::new(),
                })
        })
    }
}
