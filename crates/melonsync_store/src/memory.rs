//! In-memory document store for testing.

use crate::error::{StoreError, StoreResult};
use crate::path::{CollectionPath, DocPath};
use crate::store::{Document, DocumentStore, Snapshot, WriteOp};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use uuid::Uuid;

/// The reference environment's transaction cap.
pub const DEFAULT_WRITE_LIMIT: usize = 500;

/// An in-memory document store.
///
/// Stores all documents in a single map keyed by full path; collections
/// are implicit path prefixes. Suitable for:
/// - Unit and integration tests
/// - Ephemeral sync contexts that don't need persistence
///
/// Enforces the same constraints as the hosted backend it stands in for:
/// atomic commits capped at [`write_limit`](DocumentStore::write_limit)
/// operations, and `/`-free document keys.
#[derive(Debug)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Document>>,
    write_limit: usize,
}

impl MemoryStore {
    /// Creates a store with the reference write limit of 500.
    #[must_use]
    pub fn new() -> Self {
        Self::with_write_limit(DEFAULT_WRITE_LIMIT)
    }

    /// Creates a store with a custom write limit.
    ///
    /// Tests lower the limit to exercise batching paths without
    /// generating hundreds of rows.
    #[must_use]
    pub fn with_write_limit(write_limit: usize) -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            write_limit,
        }
    }

    /// Returns the total number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Returns true if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    fn apply(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        if ops.len() > self.write_limit {
            return Err(StoreError::TooManyWrites {
                count: ops.len(),
                limit: self.write_limit,
            });
        }

        let mut docs = self.docs.write();
        for op in ops {
            match op {
                WriteOp::Set { doc, data, merge } => {
                    let key = doc.as_str().to_string();
                    match docs.get_mut(&key) {
                        Some(existing) if merge => {
                            for (field, value) in data {
                                existing.insert(field, value);
                            }
                        }
                        _ => {
                            docs.insert(key, data);
                        }
                    }
                }
                WriteOp::Delete { doc } => {
                    docs.remove(doc.as_str());
                }
            }
        }
        Ok(())
    }

    /// Returns snapshots for direct children of `collection`, in key
    /// order.
    fn children(&self, collection: &CollectionPath) -> Vec<Snapshot> {
        let prefix = format!("{}/", collection.as_str());
        self.docs
            .read()
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .map(|(path, data)| {
                Snapshot::new(DocPath::from_trusted(path.clone()), Some(data.clone()))
            })
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, doc: &DocPath) -> StoreResult<Snapshot> {
        let data = self.docs.read().get(doc.as_str()).cloned();
        Ok(Snapshot::new(doc.clone(), data))
    }

    fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<Snapshot>> {
        Ok(self.children(collection))
    }

    fn query_range(
        &self,
        collection: &CollectionPath,
        field: &str,
        start: u64,
        end: u64,
    ) -> StoreResult<Vec<Snapshot>> {
        let mut matches: Vec<(u64, Snapshot)> = self
            .children(collection)
            .into_iter()
            .filter_map(|snapshot| {
                let value = snapshot.data()?.get(field)?.as_u64()?;
                (start..end).contains(&value).then_some((value, snapshot))
            })
            .collect();
        // Stable sort keeps key order for equal field values.
        matches.sort_by_key(|(value, _)| *value);
        Ok(matches.into_iter().map(|(_, snapshot)| snapshot).collect())
    }

    fn commit_transaction(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        self.apply(ops)
    }

    fn commit_batch(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        self.apply(ops)
    }

    fn new_document_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn write_limit(&self) -> usize {
        self.write_limit
    }
}
