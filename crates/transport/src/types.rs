use serde::{Deserialize, Serialize};

/// One attachment on a remote message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub filename: String,
}

/// A message as returned by the channel history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl RemoteMessage {
    /// The attachment URL if the message carries exactly one attachment.
    pub fn single_attachment(&self) -> Option<&str> {
        match self.attachments.as_slice() {
            [only] => Some(only.url.as_str()),
            _ => None,
        }
    }
}
