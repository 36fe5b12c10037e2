use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Smallest accepted chunk size in MiB.
pub const MIN_CHUNK_MIB: u32 = 5;

/// Largest accepted chunk size in MiB. Bounded by the remote attachment limit.
pub const MAX_CHUNK_MIB: u32 = 25;

/// Chunk size used when the configured value is unusable.
pub const DEFAULT_CHUNK_MIB: u32 = 5;

const MIB: usize = 1024 * 1024;

/// Error returned when a chunk size falls outside the accepted range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("chunk size {0} MiB is outside {MIN_CHUNK_MIB}..={MAX_CHUNK_MIB}")]
pub struct ConfigRangeError(pub i64);

/// Chunk size in MiB, always within `[MIN_CHUNK_MIB, MAX_CHUNK_MIB]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSize(u32);

impl Default for ChunkSize {
    fn default() -> Self {
        Self(DEFAULT_CHUNK_MIB)
    }
}

impl ChunkSize {
    /// Validates `mib` against the accepted range.
    pub fn new(mib: i64) -> Result<Self, ConfigRangeError> {
        if (MIN_CHUNK_MIB as i64..=MAX_CHUNK_MIB as i64).contains(&mib) {
            Ok(Self(mib as u32))
        } else {
            Err(ConfigRangeError(mib))
        }
    }

    /// Like [`new`](Self::new) but falls back to the default when out of range.
    pub fn clamped(mib: i64) -> Self {
        Self::new(mib).unwrap_or_else(|e| {
            tracing::warn!("{e}, using {DEFAULT_CHUNK_MIB} MiB");
            Self::default()
        })
    }

    /// Parses user input. Anything that is not an in-range integer yields
    /// the default.
    pub fn parse(input: &str) -> Self {
        match input.trim().parse::<i64>() {
            Ok(mib) => Self::clamped(mib),
            Err(_) => {
                tracing::warn!(input, "chunk size is not a number, using {DEFAULT_CHUNK_MIB} MiB");
                Self::default()
            }
        }
    }

    /// Size in MiB.
    pub fn mib(self) -> u32 {
        self.0
    }

    /// Size in bytes.
    pub fn bytes(self) -> usize {
        self.0 as usize * MIB
    }
}

impl Serialize for ChunkSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for ChunkSize {
    /// Out-of-range stored values are clamped instead of rejected.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mib = i64::deserialize(deserializer)?;
        Ok(Self::clamped(mib))
    }
}
