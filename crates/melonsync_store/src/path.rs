//! Document and collection paths.

use crate::error::{StoreError, StoreResult};
use std::fmt;

fn check_segment(segment: &str) -> StoreResult<()> {
    if segment.is_empty() || segment.contains('/') {
        return Err(StoreError::InvalidKey {
            key: segment.to_string(),
        });
    }
    Ok(())
}

/// Path to a document in the remote store.
///
/// Paths are `/`-joined segments alternating collection name and document
/// key, e.g. `sync/main/entries/aaa`. Segments never contain `/`; logical
/// row ids are percent-encoded before they become document keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath(String);

impl DocPath {
    /// Creates a document path from a raw `/`-joined string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if the path is empty or any
    /// segment is empty.
    pub fn new(path: impl Into<String>) -> StoreResult<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(StoreError::InvalidKey { key: path });
        }
        for segment in path.split('/') {
            check_segment(segment)?;
        }
        Ok(Self(path))
    }

    /// Wraps a path that is already known to be valid (e.g. a key read
    /// back from the store).
    pub(crate) fn from_trusted(path: String) -> Self {
        Self(path)
    }

    /// Returns the full path as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the document key (the final path segment).
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the subcollection with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if the name is empty or
    /// contains `/`.
    pub fn collection(&self, name: &str) -> StoreResult<CollectionPath> {
        check_segment(name)?;
        Ok(CollectionPath(format!("{}/{}", self.0, name)))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path to a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Returns the full path as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path of the document with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if the key is empty or contains
    /// `/` - the constraint that forces logical row ids through the id
    /// codec.
    pub fn doc(&self, key: &str) -> StoreResult<DocPath> {
        check_segment(key)?;
        Ok(DocPath(format!("{}/{}", self.0, key)))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_path_segments() {
        let root = DocPath::new("sync/main").unwrap();
        assert_eq!(root.as_str(), "sync/main");
        assert_eq!(root.id(), "main");

        let col = root.collection("entries").unwrap();
        assert_eq!(col.as_str(), "sync/main/entries");

        let doc = col.doc("aaa").unwrap();
        assert_eq!(doc.as_str(), "sync/main/entries/aaa");
        assert_eq!(doc.id(), "aaa");
    }

    #[test]
    fn empty_path_rejected() {
        assert!(DocPath::new("").is_err());
        assert!(DocPath::new("a//b").is_err());
        assert!(DocPath::new("a/").is_err());
    }

    #[test]
    fn slash_in_key_rejected() {
        let root = DocPath::new("sync/main").unwrap();
        let col = root.collection("entries").unwrap();
        let result = col.doc("rss://feed");
        assert!(matches!(result, Err(StoreError::InvalidKey { .. })));
    }

    #[test]
    fn empty_key_rejected() {
        let root = DocPath::new("sync/main").unwrap();
        assert!(root.collection("").is_err());
        let col = root.collection("entries").unwrap();
        assert!(col.doc("").is_err());
    }
}
