//! Pull: reconstruct a merged changeset across the revision range.
//!
//! Revisions pushed inline live under the root; revisions pushed via the
//! side-batch path live under their own side-batch document. The walk
//! clumps contiguous root revisions into single range queries and visits
//! each side-batch revision individually - a later root revision may
//! overwrite a row an earlier side-batch created, so the merge order must
//! follow revisions.

use crate::error::SyncResult;
use crate::root::RootState;
use melonsync_protocol::{decode_id, fields, record, Changeset, PullArgs, PullResponse, Row, TableChanges};
use melonsync_store::{DocPath, DocumentStore};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Per-table accumulator with JS-object semantics: first insertion fixes
/// the position, later writes for the same id replace the payload.
#[derive(Debug, Default)]
struct TableAccum {
    updated_order: Vec<String>,
    updated: HashMap<String, Row>,
    deleted_order: Vec<String>,
    deleted: HashSet<String>,
}

impl TableAccum {
    fn record_update(&mut self, id: String, row: Row) {
        if !self.updated.contains_key(&id) {
            self.updated_order.push(id.clone());
        }
        self.updated.insert(id, row);
    }

    fn record_delete(&mut self, id: String) {
        if self.deleted.insert(id.clone()) {
            self.deleted_order.push(id);
        }
    }
}

/// Pulls all changes in `[args.last_pulled_at ?? 1, endRevisionExclusive)`
/// for the requested tables.
pub(crate) fn pull<S: DocumentStore>(
    store: &S,
    root: &DocPath,
    tables: &[String],
    args: &PullArgs,
) -> SyncResult<PullResponse> {
    let state = RootState::from_snapshot(&store.get(root)?)?;
    let end_revision = state.end_revision_exclusive();
    let tokens = state.batch_tokens();

    let mut accum: BTreeMap<String, TableAccum> = tables
        .iter()
        .map(|table| (table.clone(), TableAccum::default()))
        .collect();

    let mut start = args.last_pulled_at.unwrap_or(1);
    debug!(start, end_revision, "pulling revision range");

    while start < end_revision {
        let mut end = start;
        while end < end_revision && !tokens.contains_key(&end) {
            end += 1;
        }

        if end == start {
            // A single side-batch revision.
            let batch_doc = root
                .collection(fields::BATCHES_COLLECTION)?
                .doc(&tokens[&start])?;
            end += 1;
            merge_creates_and_updates(store, &batch_doc, start, end, &mut accum)?;

            let header = store.get(&batch_doc)?;
            if let Some(data) = header.data() {
                mark_deletes(data.get(fields::DELETES), &mut accum)?;
            }
        } else {
            // A contiguous run of root revisions, one query per table.
            merge_creates_and_updates(store, root, start, end, &mut accum)?;

            let delete_records = root.collection(fields::DELETES_COLLECTION)?;
            for snapshot in
                store.query_range(&delete_records, fields::DELETE_REVISION, start, end)?
            {
                if let Some(data) = snapshot.data() {
                    mark_deletes(data.get(fields::DELETES), &mut accum)?;
                }
            }
        }

        start = end;
    }

    let mut changes = Changeset::new();
    for (table, mut table_accum) in accum {
        let mut table_changes = TableChanges::default();
        for id in table_accum.updated_order {
            // A deletion in the pulled range occludes any update.
            if table_accum.deleted.contains(&id) {
                continue;
            }
            if let Some(row) = table_accum.updated.remove(&id) {
                table_changes.updated.push(row);
            }
        }
        table_changes.deleted = table_accum.deleted_order;
        changes.insert(table, table_changes);
    }

    Ok(PullResponse {
        changes,
        timestamp: end_revision,
    })
}

/// Merges every record written under `parent` at a revision in
/// `[start, end)` into the accumulator, ascending so the latest revision
/// wins.
fn merge_creates_and_updates<S: DocumentStore>(
    store: &S,
    parent: &DocPath,
    start: u64,
    end: u64,
    accum: &mut BTreeMap<String, TableAccum>,
) -> SyncResult<()> {
    for (table, table_accum) in accum.iter_mut() {
        let collection = parent.collection(table)?;
        for snapshot in store.query_range(&collection, fields::RECORD_REVISION, start, end)? {
            let id = decode_id(snapshot.id())?;
            let Some(mut row) = snapshot.into_data() else {
                continue;
            };
            record::strip_on_read(&mut row);
            table_accum.record_update(id, row);
        }
    }
    Ok(())
}

/// Marks every id of a `deletes` wire value as deleted. Tables that were
/// not requested are ignored.
fn mark_deletes(
    deletes: Option<&Value>,
    accum: &mut BTreeMap<String, TableAccum>,
) -> SyncResult<()> {
    let Some(Value::Object(map)) = deletes else {
        return Ok(());
    };
    for (table, encoded_ids) in map {
        let Some(table_accum) = accum.get_mut(table) else {
            continue;
        };
        let Some(encoded_ids) = encoded_ids.as_array() else {
            continue;
        };
        for encoded in encoded_ids {
            if let Some(encoded) = encoded.as_str() {
                table_accum.record_delete(decode_id(encoded)?);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accum_keeps_first_position_last_payload() {
        let mut accum = TableAccum::default();
        let mut first = Row::new();
        first.insert("v".to_string(), Value::from(1));
        let mut second = Row::new();
        second.insert("v".to_string(), Value::from(2));

        accum.record_update("a".to_string(), first);
        accum.record_update("b".to_string(), Row::new());
        accum.record_update("a".to_string(), second);

        assert_eq!(accum.updated_order, vec!["a", "b"]);
        assert_eq!(accum.updated["a"]["v"], Value::from(2));
    }

    #[test]
    fn accum_deduplicates_deletes() {
        let mut accum = TableAccum::default();
        accum.record_delete("x".to_string());
        accum.record_delete("y".to_string());
        accum.record_delete("x".to_string());
        assert_eq!(accum.deleted_order, vec!["x", "y"]);
    }

    #[test]
    fn mark_deletes_ignores_unknown_tables() {
        let mut accum = BTreeMap::new();
        accum.insert("entries".to_string(), TableAccum::default());

        let value = serde_json::json!({
            "entries": ["a"],
            "unrequested": ["b"],
        });
        mark_deletes(Some(&value), &mut accum).unwrap();

        assert_eq!(accum["entries"].deleted_order, vec!["a"]);
        assert_eq!(accum.len(), 1);
    }

    #[test]
    fn mark_deletes_tolerates_missing_value() {
        let mut accum = BTreeMap::new();
        accum.insert("entries".to_string(), TableAccum::default());
        mark_deletes(None, &mut accum).unwrap();
        assert!(accum["entries"].deleted_order.is_empty());
    }
}
