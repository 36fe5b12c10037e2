use std::fmt;
use std::str::FromStr;

use crate::ROOT_NAME;

/// A directory path anchored at the root, e.g. `root/docs/2024`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirPath {
    segments: Vec<String>,
}

impl DirPath {
    /// The root directory itself.
    pub fn root() -> Self {
        Self {
            segments: vec![ROOT_NAME.to_string()],
        }
    }

    /// Parses a `/`-separated path.
    ///
    /// Blank segments are dropped and `root` is prepended unless the first
    /// segment already is `root` (case-insensitive). An empty input yields
    /// the root path.
    pub fn parse(text: &str) -> Self {
        Self::from_segments(text.split('/'))
    }

    /// Builds a path from individual segments, anchoring it at the root.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parts: Vec<String> = segments
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        match parts.first() {
            Some(first) if first.eq_ignore_ascii_case(ROOT_NAME) => {
                parts[0] = ROOT_NAME.to_string();
            }
            _ => parts.insert(0, ROOT_NAME.to_string()),
        }
        Self { segments: parts }
    }

    /// All segments, starting with `root`.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segments below the root.
    pub fn below_root(&self) -> &[String] {
        &self.segments[1..]
    }
}

impl Default for DirPath {
    fn default() -> Self {
        Self::root()
    }
}

impl FromStr for DirPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for DirPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
