//! The sync engine facade.

use crate::error::SyncResult;
use crate::retry::with_single_retry;
use crate::{pull, push};
use melonsync_protocol::{PullArgs, PullResponse, PushArgs};
use melonsync_store::{DocPath, DocumentStore};

/// Client-side revision engine bound to one sync context.
///
/// The engine owns no process-wide state: every pull or push builds its
/// own transaction queue, batch writer, and delete-reference map. The
/// caller serializes its own pull/push calls; the engine defends only
/// against a stale caller via the watermark check.
///
/// # Example
///
/// ```
/// use melonsync_engine::SyncEngine;
/// use melonsync_protocol::PullArgs;
/// use melonsync_store::{DocPath, MemoryStore};
///
/// let store = MemoryStore::new();
/// let root = DocPath::new("sync/main").unwrap();
/// let engine = SyncEngine::new(store, root);
///
/// let tables = vec!["entries".to_string()];
/// let response = engine.pull(&tables, &PullArgs::full()).unwrap();
/// assert_eq!(response.timestamp, 1);
/// ```
#[derive(Debug)]
pub struct SyncEngine<S: DocumentStore> {
    store: S,
    root: DocPath,
}

impl<S: DocumentStore> SyncEngine<S> {
    /// Creates an engine over `store`, rooted at the given document.
    pub fn new(store: S, root: DocPath) -> Self {
        Self { store, root }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the root document path.
    pub fn root(&self) -> &DocPath {
        &self.root
    }

    /// Pulls all remote changes since the caller's watermark, merged
    /// across the root and every side-batch.
    pub fn pull(&self, tables: &[String], args: &PullArgs) -> SyncResult<PullResponse> {
        pull::pull(&self.store, &self.root, tables, args)
    }

    /// Pushes a local changeset as the next revision, choosing the inline
    /// or side-batch path by size.
    pub fn push(&self, args: &PushArgs) -> SyncResult<()> {
        push::push(&self.store, &self.root, args)
    }

    /// [`pull`](Self::pull) with the sync-framework contract's single
    /// automatic retry.
    pub fn pull_with_retry(&self, tables: &[String], args: &PullArgs) -> SyncResult<PullResponse> {
        with_single_retry(|| self.pull(tables, args))
    }

    /// [`push`](Self::push) with the sync-framework contract's single
    /// automatic retry.
    pub fn push_with_retry(&self, args: &PushArgs) -> SyncResult<()> {
        with_single_retry(|| self.push(args))
    }
}
