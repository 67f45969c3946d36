//! Push: submit a local changeset as one new revision.
//!
//! A push commits revision `next = latest + 1` atomically. When the
//! changeset fits one remote transaction it goes directly under the root
//! (the inline path). When it does not, the records are first staged into
//! a private side-batch document through W-sized write batches, then a
//! single transaction links the side-batch token from the root - the
//! side-batch is invisible to readers until that transaction commits.

use crate::delete_refs::{find_delete_refs, DeleteRefs};
use crate::error::{SyncError, SyncResult};
use crate::root::{deletes_value, root_update, root_update_with_tokens, RootState};
use crate::writer::BatchWriter;
use chrono::{SecondsFormat, Utc};
use melonsync_protocol::{encode_id, fields, record, PushArgs};
use melonsync_store::{DocPath, Document, DocumentStore, StoreResult, Transaction};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The number of record writes and deletes a push would perform, plus one
/// for the delete-record document when any deletes were discovered. Upper
/// bound: an id listed as both created and updated counts twice.
fn count_changes(args: &PushArgs, delete_refs: &DeleteRefs) -> usize {
    let writes: usize = args.changes.values().map(|table| table.write_count()).sum();
    let deletes = delete_refs.total();
    writes + if deletes > 0 { deletes + 1 } else { 0 }
}

/// Pushes `args.changes` as the next revision.
pub(crate) fn push<S: DocumentStore>(
    store: &S,
    root: &DocPath,
    args: &PushArgs,
) -> SyncResult<()> {
    let state = RootState::from_snapshot(&store.get(root)?)?;
    let delete_refs = find_delete_refs(store, root, &state.batch_tokens(), &args.changes)?;

    let effective = count_changes(args, &delete_refs);
    let limit = store.write_limit();

    // One write is reserved for the root update.
    if effective + 1 <= limit {
        debug!(
            watermark = args.last_pulled_at,
            writes = effective,
            "pushing inline"
        );
        push_inline(store, root, args, &delete_refs)
    } else {
        debug!(
            watermark = args.last_pulled_at,
            writes = effective,
            limit,
            "changeset exceeds one transaction, pushing via side batch"
        );
        push_batched(store, root, args, &delete_refs, state.next_revision())
    }
}

/// Inline path: the whole push is one remote transaction.
fn push_inline<S: DocumentStore>(
    store: &S,
    root: &DocPath,
    args: &PushArgs,
    delete_refs: &DeleteRefs,
) -> SyncResult<()> {
    let mut txn = Transaction::new(store);

    let state = RootState::from_snapshot(&txn.get(root)?)?;
    let revision = state.next_revision();
    if revision != args.last_pulled_at {
        return Err(SyncError::OutOfSync {
            watermark: args.last_pulled_at,
            next_revision: revision,
        });
    }

    let mut table_deletes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (table, table_changes) in &args.changes {
        let collection = root.collection(table)?;
        for row in table_changes.created.iter().chain(&table_changes.updated) {
            let id = record::row_id(row).ok_or_else(|| SyncError::MissingRowId {
                table: table.clone(),
            })?;
            // Always a set, never an update: a row updated locally may
            // live only in a side-batch, leaving no root copy to update.
            let doc = collection.doc(&encode_id(id))?;
            txn.set(&doc, record::prepare_for_write(row, revision));
        }

        let refs = delete_refs.for_table(table);
        if !refs.is_empty() {
            let encoded = table_deletes.entry(table.clone()).or_default();
            for reference in refs {
                encoded.push(reference.encoded_id.clone());
                txn.delete(&reference.doc);
            }
        }
    }

    if !table_deletes.is_empty() {
        let collection = root.collection(fields::DELETES_COLLECTION)?;
        let doc = collection.doc(&store.new_document_id())?;
        txn.set(&doc, delete_record(revision, &table_deletes));
    }

    txn.set_merge(root, root_update(revision, &now_iso()));
    txn.commit()?;

    info!(revision, "push committed inline");
    Ok(())
}

/// Side-batch path: stage, integrate, rollback on integrate failure.
fn push_batched<S: DocumentStore>(
    store: &S,
    root: &DocPath,
    args: &PushArgs,
    delete_refs: &DeleteRefs,
    revision: u64,
) -> SyncResult<()> {
    let token = store.new_document_id();
    let batch_doc = root.collection(fields::BATCHES_COLLECTION)?.doc(&token)?;

    // Stage: unprotected streaming writes into the side-batch. The
    // revision comes from the planner's pre-read and is re-verified by
    // the integrate transaction. A failure here leaves orphans that no
    // root references.
    let deletes = stage(store, &batch_doc, args, delete_refs, revision)?;
    debug!(revision, token = %token, "side batch staged");

    match integrate(store, root, &batch_doc, &token, args, revision, &deletes) {
        Ok(()) => {
            info!(revision, token = %token, "push committed via side batch");
            Ok(())
        }
        Err(integrate_err) => {
            warn!(
                revision,
                token = %token,
                error = %integrate_err,
                "integrate failed, rolling back staged side batch"
            );
            match rollback(store, &batch_doc, args) {
                Ok(()) => Err(integrate_err),
                Err(rollback_err) => Err(SyncError::RollbackFailed {
                    integrate: Box::new(integrate_err),
                    rollback: rollback_err,
                }),
            }
        }
    }
}

fn stage<S: DocumentStore>(
    store: &S,
    batch_doc: &DocPath,
    args: &PushArgs,
    delete_refs: &DeleteRefs,
    revision: u64,
) -> SyncResult<BTreeMap<String, Vec<String>>> {
    let mut deletes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut writer = BatchWriter::new(store);

    // Tables run serially so the writer's counter stays honest.
    for (table, table_changes) in &args.changes {
        let collection = batch_doc.collection(table)?;
        for row in table_changes.created.iter().chain(&table_changes.updated) {
            let id = record::row_id(row).ok_or_else(|| SyncError::MissingRowId {
                table: table.clone(),
            })?;
            let doc = collection.doc(&encode_id(id))?;
            writer
                .add(&doc, record::prepare_for_write(row, revision))
                .map_err(|source| SyncError::StageFailed { source })?;
        }

        let refs = delete_refs.for_table(table);
        if !refs.is_empty() {
            deletes
                .entry(table.clone())
                .or_default()
                .extend(refs.iter().map(|reference| reference.encoded_id.clone()));
            writer
                .add_deletes(refs.iter().map(|reference| reference.doc.clone()))
                .map_err(|source| SyncError::StageFailed { source })?;
        }
    }

    writer
        .flush()
        .map_err(|source| SyncError::StageFailed { source })?;
    Ok(deletes)
}

fn integrate<S: DocumentStore>(
    store: &S,
    root: &DocPath,
    batch_doc: &DocPath,
    token: &str,
    args: &PushArgs,
    revision: u64,
    deletes: &BTreeMap<String, Vec<String>>,
) -> SyncResult<()> {
    let mut txn = Transaction::new(store);

    let state = RootState::from_snapshot(&txn.get(root)?)?;
    let next_revision = state.next_revision();
    if next_revision != args.last_pulled_at {
        return Err(SyncError::OutOfSync {
            watermark: args.last_pulled_at,
            next_revision,
        });
    }

    let date = now_iso();
    txn.set(batch_doc, batch_header(revision, &date, deletes));

    let mut tokens = state.batch_tokens();
    tokens.insert(revision, token.to_string());
    txn.set_merge(root, root_update_with_tokens(revision, &date, &tokens));

    txn.commit()
        .map_err(|source| SyncError::IntegrateFailed { source })
}

/// Deletes every staged table document under `batch_doc`. The header
/// itself was never written - only the integrate transaction writes it.
fn rollback<S: DocumentStore>(
    store: &S,
    batch_doc: &DocPath,
    args: &PushArgs,
) -> StoreResult<()> {
    let mut writer = BatchWriter::new(store);
    for table in args.changes.keys() {
        let staged = store.list(&batch_doc.collection(table)?)?;
        writer.add_deletes(staged.into_iter().map(|snapshot| snapshot.path().clone()))?;
    }
    writer.flush()
}

/// Builds the delete-record document for an inline push with deletes.
fn delete_record(revision: u64, deletes: &BTreeMap<String, Vec<String>>) -> Document {
    let mut doc = Document::new();
    doc.insert(fields::DELETE_REVISION.to_string(), Value::from(revision));
    doc.insert(fields::DELETES.to_string(), deletes_value(deletes));
    doc
}

/// Builds the side-batch header written by the integrate transaction.
fn batch_header(revision: u64, date: &str, deletes: &BTreeMap<String, Vec<String>>) -> Document {
    let mut doc = Document::new();
    doc.insert(fields::LATEST_REVISION.to_string(), Value::from(revision));
    doc.insert(fields::LATEST_DATE.to_string(), Value::from(date));
    doc.insert(fields::DELETES.to_string(), deletes_value(deletes));
    doc
}
