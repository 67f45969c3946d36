//! Delete-reference discovery.
//!
//! A row updated inside a batched push is copied into the side-batch, not
//! moved, so a single logical id may have live copies at the root and in
//! several side-batches at once. Deleting a row therefore means probing
//! every region a copy could live in and deleting everything found.

use crate::error::SyncResult;
use melonsync_protocol::{encode_id, fields, Changeset};
use melonsync_store::{CollectionPath, DocPath, DocumentStore};
use std::collections::BTreeMap;

/// A remote document discovered to hold a copy of a deleted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRef {
    /// The document to delete.
    pub doc: DocPath,
    /// The encoded row id (the document key).
    pub encoded_id: String,
}

/// Discovered delete references, grouped by table.
#[derive(Debug, Default)]
pub struct DeleteRefs {
    by_table: BTreeMap<String, Vec<DeleteRef>>,
}

impl DeleteRefs {
    /// Total number of references across all tables.
    #[must_use]
    pub fn total(&self) -> usize {
        self.by_table.values().map(Vec::len).sum()
    }

    /// Returns true if no references were discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_table.values().all(Vec::is_empty)
    }

    /// References discovered for one table.
    #[must_use]
    pub fn for_table(&self, table: &str) -> &[DeleteRef] {
        self.by_table.get(table).map_or(&[], Vec::as_slice)
    }

    fn push(&mut self, table: &str, reference: DeleteRef) {
        self.by_table
            .entry(table.to_string())
            .or_default()
            .push(reference);
    }
}

/// Resolves the delete lists of `changes` to concrete document
/// references.
///
/// For each deleted logical id the root table document is probed first,
/// then every live side-batch - all of them, regardless of the caller's
/// watermark, because the row may have been created arbitrarily far in
/// the past. The same id may yield several references; each discovered
/// copy must be deleted.
pub fn find_delete_refs<S: DocumentStore>(
    store: &S,
    root: &DocPath,
    batch_tokens: &BTreeMap<u64, String>,
    changes: &Changeset,
) -> SyncResult<DeleteRefs> {
    let mut refs = DeleteRefs::default();

    let batches = root.collection(fields::BATCHES_COLLECTION)?;
    let batch_docs: Vec<DocPath> = batch_tokens
        .values()
        .map(|token| batches.doc(token))
        .collect::<Result<_, _>>()?;

    for (table, table_changes) in changes {
        if table_changes.deleted.is_empty() {
            continue;
        }

        let mut regions: Vec<CollectionPath> = Vec::with_capacity(batch_docs.len() + 1);
        regions.push(root.collection(table)?);
        for batch_doc in &batch_docs {
            regions.push(batch_doc.collection(table)?);
        }

        for id in &table_changes.deleted {
            let encoded = encode_id(id);
            for region in &regions {
                let doc = region.doc(&encoded)?;
                if store.get(&doc)?.exists() {
                    refs.push(
                        table,
                        DeleteRef {
                            doc,
                            encoded_id: encoded.clone(),
                        },
                    );
                }
            }
        }
    }

    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use melonsync_protocol::TableChanges;
    use melonsync_store::{Document, MemoryStore, WriteBatch};

    fn root() -> DocPath {
        DocPath::new("sync/main").unwrap()
    }

    fn put(store: &MemoryStore, path: &DocPath) {
        let mut batch = WriteBatch::new(store);
        batch.set(path, Document::new());
        batch.commit().unwrap();
    }

    fn deletions(ids: &[&str]) -> Changeset {
        let mut changes = Changeset::new();
        changes.insert(
            "entries".to_string(),
            TableChanges::default().with_deleted(ids.iter().map(|s| s.to_string()).collect()),
        );
        changes
    }

    #[test]
    fn missing_rows_yield_no_refs() {
        let store = MemoryStore::new();
        let refs =
            find_delete_refs(&store, &root(), &BTreeMap::new(), &deletions(&["ghost"])).unwrap();
        assert!(refs.is_empty());
        assert_eq!(refs.total(), 0);
    }

    #[test]
    fn root_copy_is_found() {
        let store = MemoryStore::new();
        let doc = root()
            .collection("entries")
            .unwrap()
            .doc("aaa")
            .unwrap();
        put(&store, &doc);

        let refs =
            find_delete_refs(&store, &root(), &BTreeMap::new(), &deletions(&["aaa"])).unwrap();
        assert_eq!(refs.total(), 1);
        assert_eq!(refs.for_table("entries")[0].doc, doc);
        assert_eq!(refs.for_table("entries")[0].encoded_id, "aaa");
    }

    #[test]
    fn copies_in_every_region_are_found() {
        let store = MemoryStore::new();
        let root = root();
        let root_copy = root.collection("entries").unwrap().doc("aaa").unwrap();
        put(&store, &root_copy);

        let mut tokens = BTreeMap::new();
        for (revision, token) in [(2u64, "tok2"), (5u64, "tok5")] {
            tokens.insert(revision, token.to_string());
            let batch_copy = root
                .collection("melonBatches")
                .unwrap()
                .doc(token)
                .unwrap()
                .collection("entries")
                .unwrap()
                .doc("aaa")
                .unwrap();
            put(&store, &batch_copy);
        }

        let refs = find_delete_refs(&store, &root, &tokens, &deletions(&["aaa"])).unwrap();
        // One copy at the root plus one per side-batch.
        assert_eq!(refs.total(), 3);
    }

    #[test]
    fn encoded_ids_are_probed() {
        let store = MemoryStore::new();
        let doc = root()
            .collection("entries")
            .unwrap()
            .doc(&encode_id("a/b"))
            .unwrap();
        put(&store, &doc);

        let refs =
            find_delete_refs(&store, &root(), &BTreeMap::new(), &deletions(&["a/b"])).unwrap();
        assert_eq!(refs.total(), 1);
        assert_eq!(refs.for_table("entries")[0].encoded_id, "a%2Fb");
    }

    #[test]
    fn tables_without_deletions_are_skipped() {
        let store = MemoryStore::new();
        let mut changes = Changeset::new();
        changes.insert("entries".to_string(), TableChanges::default());
        let refs = find_delete_refs(&store, &root(), &BTreeMap::new(), &changes).unwrap();
        assert!(refs.is_empty());
    }
}
