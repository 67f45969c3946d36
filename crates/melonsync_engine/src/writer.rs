//! Streaming writer that spills over the store's transaction cap.

use melonsync_store::{DocPath, Document, DocumentStore, StoreResult, WriteBatch};
use tracing::trace;

/// Streams an unbounded set of writes and deletes through W-sized write
/// batches.
///
/// The writer owns a current batch and a running count. Each queued
/// operation increments the count; on reaching the store's write limit
/// the batch commits and a fresh one opens. [`flush`](Self::flush)
/// commits the remainder and consumes the writer, so a flushed writer
/// cannot be reused.
///
/// The writer is strictly sequential: it holds mutable state, and callers
/// must finish each call before the next. Any commit error propagates
/// immediately; there is no partial retry.
#[derive(Debug)]
pub struct BatchWriter<'a, S: DocumentStore> {
    store: &'a S,
    batch: WriteBatch<'a, S>,
    limit: usize,
    batches_committed: usize,
}

impl<'a, S: DocumentStore> BatchWriter<'a, S> {
    /// Creates a writer bound to `store`, sized to its write limit.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            batch: WriteBatch::new(store),
            limit: store.write_limit(),
            batches_committed: 0,
        }
    }

    /// Queues one document write.
    pub fn add(&mut self, doc: &DocPath, data: Document) -> StoreResult<()> {
        self.batch.set(doc, data);
        self.spill_if_full()
    }

    /// Queues deletes for every given document. The iterator may yield
    /// more refs than one batch holds; full batches commit as they fill
    /// and the remainder carries forward.
    pub fn add_deletes<I>(&mut self, docs: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = DocPath>,
    {
        for doc in docs {
            self.batch.delete(&doc);
            self.spill_if_full()?;
        }
        Ok(())
    }

    /// Commits the current (possibly partial) batch and consumes the
    /// writer.
    pub fn flush(mut self) -> StoreResult<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.commit_current()
    }

    /// Number of batches committed so far.
    #[must_use]
    pub fn batches_committed(&self) -> usize {
        self.batches_committed
    }

    fn spill_if_full(&mut self) -> StoreResult<()> {
        if self.batch.len() >= self.limit {
            self.commit_current()?;
        }
        Ok(())
    }

    fn commit_current(&mut self) -> StoreResult<()> {
        let full = std::mem::replace(&mut self.batch, WriteBatch::new(self.store));
        trace!(writes = full.len(), "committing write batch");
        full.commit()?;
        self.batches_committed += 1;
        Ok(())
    }
}
