//! Artifact keys and references to stored binaries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable key of the artifact a conversion targets (e.g. a part iteration).
///
/// At most one conversion may be pending per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ArtifactKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ArtifactKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Reference to a binary held by the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryResource {
    /// Full store path, e.g. `part-7/geometries/model60.obj`.
    pub full_name: String,
    /// File name component.
    pub name: String,
    /// Size in bytes as recorded at persistence time.
    pub content_length: u64,
}

impl BinaryResource {
    /// Build a resource reference from a store path. The name is the last
    /// `/`-separated segment.
    pub fn new(full_name: impl Into<String>, content_length: u64) -> Self {
        let full_name = full_name.into();
        let name = full_name
            .rsplit('/')
            .next()
            .unwrap_or(full_name.as_str())
            .to_string();
        Self {
            full_name,
            name,
            content_length,
        }
    }

    /// Extension of the trimmed file name (text after the last dot), if any.
    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.name.trim().rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_full_name() {
        let res = BinaryResource::new("part-1/sources/model.step", 10);
        assert_eq!(res.name, "model.step");
        assert_eq!(res.extension(), Some("step"));
    }

    #[test]
    fn test_extension_missing() {
        assert_eq!(BinaryResource::new("a/README", 0).extension(), None);
        assert_eq!(BinaryResource::new("a/.hidden", 0).extension(), None);
        assert_eq!(BinaryResource::new("a/trailing.", 0).extension(), None);
    }

    #[test]
    fn test_extension_ignores_surrounding_whitespace() {
        assert_eq!(BinaryResource::new("k/ model.step ", 0).extension(), Some("step"));
        assert_eq!(BinaryResource::new("k/archive.tar. ", 0).extension(), None);
    }

    #[test]
    fn test_extension_is_case_preserving() {
        let res = BinaryResource::new("x/MODEL.STEP", 0);
        assert_eq!(res.extension(), Some("STEP"));
    }
}
