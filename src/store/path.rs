use std::fmt;

use super::error::StoreError;

/// Characters the hosted store refuses inside a key.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

/// Slash-separated key path into the document tree. The empty path is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let mut path = Self::root();
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            path = path.child(segment)?;
        }
        Ok(path)
    }

    pub fn child(&self, key: &str) -> Result<Self, StoreError> {
        if key.is_empty() || key.contains('/') || key.contains(FORBIDDEN) {
            return Err(StoreError::InvalidPath(format!("{}/{}", self, key)));
        }
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, i.e. the key this path names inside its parent.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn starts_with(&self, other: &StorePath) -> bool {
        self.segments.starts_with(&other.segments)
    }

    /// True when one path is an ancestor of (or equal to) the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
