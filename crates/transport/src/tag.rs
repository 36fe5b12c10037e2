//! Message tag codec: `FILEID:<id> CHUNK:<index>`.

use std::fmt;

const FILE_ID_PREFIX: &str = "FILEID:";
const CHUNK_PREFIX: &str = "CHUNK:";

/// Identifies which file and which chunk a posted attachment belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkTag {
    pub file_id: String,
    pub index: u32,
}

impl ChunkTag {
    pub fn new(file_id: &str, index: u32) -> Self {
        Self {
            file_id: file_id.to_string(),
            index,
        }
    }

    /// Parses message text. Returns `None` for anything that is not a tag.
    ///
    /// The first whitespace-separated word must carry the file id and the
    /// second the chunk index; trailing words are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let file_id = words.next()?.strip_prefix(FILE_ID_PREFIX)?;
        let index = words.next()?.strip_prefix(CHUNK_PREFIX)?.parse().ok()?;
        if file_id.is_empty() {
            return None;
        }
        Some(Self::new(file_id, index))
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{FILE_ID_PREFIX}{} {CHUNK_PREFIX}{}", self.file_id, self.index)
    }
}
