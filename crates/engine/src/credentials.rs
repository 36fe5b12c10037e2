//! Round-robin credential selection.

use std::sync::atomic::{AtomicUsize, Ordering};

use drivecord_transport::Credential;

/// Cycles through an ordered credential list.
///
/// Selection is a single atomic increment, so concurrent callers never
/// race and never block each other.
#[derive(Debug)]
pub struct CredentialRing {
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

impl CredentialRing {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self {
            credentials,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next credential in the cycle, or `None` if the list is empty.
    pub fn next(&self) -> Option<Credential> {
        if self.credentials.is_empty() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(self.credentials[i % self.credentials.len()].clone())
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
