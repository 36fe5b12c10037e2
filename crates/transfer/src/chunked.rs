use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::TransferError;
use crate::types::Chunk;

/// Number of chunks a file of `file_size` bytes splits into.
///
/// Never zero: an empty file still occupies one (empty) chunk.
pub fn chunk_count(file_size: u64, chunk_size: usize) -> u32 {
    let chunk_size = chunk_size.max(1) as u64;
    file_size.div_ceil(chunk_size).max(1) as u32
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a file as consecutive, indexed chunks of at most `chunk_size` bytes.
pub struct ChunkReader {
    file: File,
    chunk_size: usize,
    next_index: u32,
    file_size: u64,
    done: bool,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    pub fn new(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        Ok(Self {
            file,
            chunk_size: chunk_size.max(1),
            next_index: 0,
            file_size,
            done: false,
        })
    }

    /// Reads the next chunk. Returns `None` once the file is exhausted.
    ///
    /// A zero-byte file produces exactly one empty chunk with index 0.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        if self.done {
            return Ok(None);
        }

        let mut buf = Vec::with_capacity(self.chunk_size.min(self.file_size as usize));
        (&mut self.file)
            .take(self.chunk_size as u64)
            .read_to_end(&mut buf)?;

        if buf.len() < self.chunk_size {
            self.done = true;
        }
        if buf.is_empty() && self.next_index > 0 {
            return Ok(None);
        }

        let chunk = Chunk {
            index: self.next_index,
            data: buf,
        };
        self.next_index += 1;
        Ok(Some(chunk))
    }

    /// Total file size in bytes, as seen when the reader was opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of chunks this reader will produce.
    pub fn chunk_count(&self) -> u32 {
        chunk_count(self.file_size, self.chunk_size)
    }
}

impl Iterator for ChunkReader {
    type Item = Result<Chunk, TransferError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Reads the whole file into ordered chunks.
pub fn split(path: &Path, chunk_size: usize) -> Result<Vec<Chunk>, TransferError> {
    ChunkReader::new(path, chunk_size)?.collect()
}

// ---------------------------------------------------------------------------
// Reassembly
// ---------------------------------------------------------------------------

/// Concatenates chunks `0..total` in index order.
///
/// Fails with [`TransferError::Incomplete`] listing every missing index.
pub fn join(chunks: &HashMap<u32, Vec<u8>>, total: u32) -> Result<Vec<u8>, TransferError> {
    let missing: Vec<u32> = (0..total).filter(|i| !chunks.contains_key(i)).collect();
    if !missing.is_empty() {
        return Err(TransferError::Incomplete { missing, total });
    }

    let size = (0..total).map(|i| chunks[&i].len()).sum();
    let mut out = Vec::with_capacity(size);
    for i in 0..total {
        out.extend_from_slice(&chunks[&i]);
    }
    Ok(out)
}

/// Joins the chunks and writes them to `path`.
///
/// Data goes to a sibling temporary file that is renamed into place, so
/// `path` either holds the complete artifact or is left untouched.
pub fn write_joined(
    path: &Path,
    chunks: &HashMap<u32, Vec<u8>>,
    total: u32,
) -> Result<PathBuf, TransferError> {
    let data = join(chunks, total)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".partial");
    let tmp = PathBuf::from(tmp_name);

    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(path.to_path_buf())
}
