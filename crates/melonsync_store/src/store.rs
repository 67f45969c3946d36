//! Document-store trait and write primitives.

use crate::error::StoreResult;
use crate::path::{CollectionPath, DocPath};
use serde_json::{Map, Value};

/// A schemaless JSON document, exactly as the remote store sees it.
pub type Document = Map<String, Value>;

/// Point-in-time view of a single document.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: DocPath,
    data: Option<Document>,
}

impl Snapshot {
    /// Creates a snapshot. `data` is `None` for a missing document.
    #[must_use]
    pub fn new(path: DocPath, data: Option<Document>) -> Self {
        Self { path, data }
    }

    /// Returns true if the document exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the document key.
    #[must_use]
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// Returns the document contents, if it exists.
    #[must_use]
    pub fn data(&self) -> Option<&Document> {
        self.data.as_ref()
    }

    /// Consumes the snapshot, returning the document contents.
    #[must_use]
    pub fn into_data(self) -> Option<Document> {
        self.data
    }
}

/// A single queued write operation.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Creates or overwrites a document. In merge mode, top-level fields
    /// absent from `data` are preserved on an existing document.
    Set {
        /// Target document.
        doc: DocPath,
        /// New contents.
        data: Document,
        /// Whether to merge with existing contents.
        merge: bool,
    },
    /// Deletes a document. Deleting a missing document is a no-op.
    Delete {
        /// Target document.
        doc: DocPath,
    },
}

/// A hierarchical remote document store.
///
/// This trait abstracts the remote backend, allowing for different
/// implementations (a hosted document database, [`MemoryStore`] for
/// testing).
///
/// # Invariants
///
/// - `commit_transaction` and `commit_batch` apply all operations or none
/// - Neither accepts more than [`write_limit`](Self::write_limit) operations
/// - `query_range` returns documents ordered ascending by the queried
///   field, ties broken by document key
///
/// [`MemoryStore`]: crate::MemoryStore
pub trait DocumentStore: Send + Sync {
    /// Reads a single document.
    fn get(&self, doc: &DocPath) -> StoreResult<Snapshot>;

    /// Returns every document directly inside `collection`.
    fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<Snapshot>>;

    /// Returns documents whose integer `field` lies in `[start, end)`,
    /// ordered by `field` ascending. Documents without an integer value
    /// for `field` are excluded.
    fn query_range(
        &self,
        collection: &CollectionPath,
        field: &str,
        start: u64,
        end: u64,
    ) -> StoreResult<Vec<Snapshot>>;

    /// Atomically applies a queued transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TooManyWrites`] if `ops` exceeds
    /// [`write_limit`](Self::write_limit).
    ///
    /// [`StoreError::TooManyWrites`]: crate::StoreError::TooManyWrites
    fn commit_transaction(&self, ops: Vec<WriteOp>) -> StoreResult<()>;

    /// Applies a non-transactional write batch. Same cap and atomicity as
    /// [`commit_transaction`](Self::commit_transaction), but without read
    /// participation.
    fn commit_batch(&self, ops: Vec<WriteOp>) -> StoreResult<()>;

    /// Returns a fresh auto-generated document key.
    fn new_document_id(&self) -> String;

    /// The maximum number of operations per transaction or batch.
    fn write_limit(&self) -> usize;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn get(&self, doc: &DocPath) -> StoreResult<Snapshot> {
        (**self).get(doc)
    }

    fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<Snapshot>> {
        (**self).list(collection)
    }

    fn query_range(
        &self,
        collection: &CollectionPath,
        field: &str,
        start: u64,
        end: u64,
    ) -> StoreResult<Vec<Snapshot>> {
        (**self).query_range(collection, field, start, end)
    }

    fn commit_transaction(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        (**self).commit_transaction(ops)
    }

    fn commit_batch(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        (**self).commit_batch(ops)
    }

    fn new_document_id(&self) -> String {
        (**self).new_document_id()
    }

    fn write_limit(&self) -> usize {
        (**self).write_limit()
    }
}

/// An open transaction: reads through to the store, writes queue locally
/// until [`commit`](Transaction::commit).
///
/// Reads performed while the transaction is open observe pre-commit state.
/// The queue is locally owned and must not be shared; committing consumes
/// it.
#[derive(Debug)]
pub struct Transaction<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    ops: Vec<WriteOp>,
}

impl<'a, S: DocumentStore + ?Sized> Transaction<'a, S> {
    /// Opens a transaction against `store`.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            ops: Vec::new(),
        }
    }

    /// Reads a document inside the transaction.
    pub fn get(&self, doc: &DocPath) -> StoreResult<Snapshot> {
        self.store.get(doc)
    }

    /// Queues an overwriting set.
    pub fn set(&mut self, doc: &DocPath, data: Document) {
        self.ops.push(WriteOp::Set {
            doc: doc.clone(),
            data,
            merge: false,
        });
    }

    /// Queues a merging set: top-level fields absent from `data` are
    /// preserved on an existing document.
    pub fn set_merge(&mut self, doc: &DocPath, data: Document) {
        self.ops.push(WriteOp::Set {
            doc: doc.clone(),
            data,
            merge: true,
        });
    }

    /// Queues a delete.
    pub fn delete(&mut self, doc: &DocPath) {
        self.ops.push(WriteOp::Delete { doc: doc.clone() });
    }

    /// Returns the number of queued writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.ops.len()
    }

    /// Commits all queued writes atomically.
    pub fn commit(self) -> StoreResult<()> {
        self.store.commit_transaction(self.ops)
    }
}

/// A non-transactional write batch, committed atomically with the same
/// write cap as a transaction.
#[derive(Debug)]
pub struct WriteBatch<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    ops: Vec<WriteOp>,
}

impl<'a, S: DocumentStore + ?Sized> WriteBatch<'a, S> {
    /// Opens a batch against `store`.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            ops: Vec::new(),
        }
    }

    /// Queues an overwriting set.
    pub fn set(&mut self, doc: &DocPath, data: Document) {
        self.ops.push(WriteOp::Set {
            doc: doc.clone(),
            data,
            merge: false,
        });
    }

    /// Queues a delete.
    pub fn delete(&mut self, doc: &DocPath) {
        self.ops.push(WriteOp::Delete { doc: doc.clone() });
    }

    /// Returns the number of queued writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Commits all queued writes.
    pub fn commit(self) -> StoreResult<()> {
        self.store.commit_batch(self.ops)
    }
}
