//! Revision metadata: reading and updating the root document.

use crate::error::{SyncError, SyncResult};
use melonsync_protocol::fields;
use melonsync_store::{Document, Snapshot};
use serde_json::Value;
use std::collections::BTreeMap;

/// Decoded root-document metadata.
///
/// The root is a partial record on the wire; the engine models it as an
/// explicit sum type so that "never written" is one honest state instead
/// of a scatter of absent fields. Push and pull derive the next revision
/// and the exclusive pull boundary from the same value: the next revision
/// to write always equals the exclusive end returned by the most recent
/// pull, and a mismatch with the caller's watermark is the stale-write
/// signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootState {
    /// The root document has never been written.
    Absent,
    /// At least one push has committed.
    Present {
        /// The most recently committed revision, >= 1.
        latest_revision: u64,
        /// Advisory date of the last push; never used for ordering.
        latest_date: Option<String>,
        /// Revision to side-batch token, one entry per revision pushed
        /// via the side-batch path.
        batch_tokens: BTreeMap<u64, String>,
    },
}

impl RootState {
    /// Decodes the root snapshot.
    ///
    /// A missing document, or a document without `melonLatestRevision`,
    /// is a never-written context.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::CorruptMetadata`] if present fields cannot be
    /// interpreted.
    pub fn from_snapshot(snapshot: &Snapshot) -> SyncResult<Self> {
        let Some(data) = snapshot.data() else {
            return Ok(Self::Absent);
        };
        let Some(revision_field) = data.get(fields::LATEST_REVISION) else {
            return Ok(Self::Absent);
        };

        let latest_revision = revision_field
            .as_u64()
            .filter(|revision| *revision >= 1)
            .ok_or_else(|| {
                SyncError::corrupt(format!(
                    "{} is not a positive integer: {revision_field}",
                    fields::LATEST_REVISION
                ))
            })?;

        let latest_date = data
            .get(fields::LATEST_DATE)
            .and_then(Value::as_str)
            .map(str::to_string);

        let batch_tokens = match data.get(fields::BATCH_TOKENS) {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => {
                let mut tokens = BTreeMap::new();
                for (revision, token) in map {
                    let revision: u64 = revision.parse().map_err(|_| {
                        SyncError::corrupt(format!("batch token revision {revision:?}"))
                    })?;
                    let token = token.as_str().ok_or_else(|| {
                        SyncError::corrupt(format!("batch token for revision {revision}"))
                    })?;
                    tokens.insert(revision, token.to_string());
                }
                tokens
            }
            Some(other) => {
                return Err(SyncError::corrupt(format!(
                    "{} is not an object: {other}",
                    fields::BATCH_TOKENS
                )))
            }
        };

        Ok(Self::Present {
            latest_revision,
            latest_date,
            batch_tokens,
        })
    }

    /// The next revision a push will write: `(latest ?? 0) + 1`.
    #[must_use]
    pub fn next_revision(&self) -> u64 {
        match self {
            Self::Absent => 1,
            Self::Present {
                latest_revision, ..
            } => latest_revision + 1,
        }
    }

    /// The exclusive end of the pullable revision range. Always equal to
    /// [`next_revision`](Self::next_revision).
    #[must_use]
    pub fn end_revision_exclusive(&self) -> u64 {
        self.next_revision()
    }

    /// The live side-batch tokens, in revision order.
    #[must_use]
    pub fn batch_tokens(&self) -> BTreeMap<u64, String> {
        match self {
            Self::Absent => BTreeMap::new(),
            Self::Present { batch_tokens, .. } => batch_tokens.clone(),
        }
    }
}

/// Builds the merge-write payload that advances the root to `revision`.
/// Merge semantics preserve `melonBatchTokens`.
pub(crate) fn root_update(revision: u64, date: &str) -> Document {
    let mut doc = Document::new();
    doc.insert(fields::LATEST_REVISION.to_string(), Value::from(revision));
    doc.insert(fields::LATEST_DATE.to_string(), Value::from(date));
    doc
}

/// Like [`root_update`], but also rewrites the batch-token map (used by
/// the side-batch integrate transaction to link the new token).
pub(crate) fn root_update_with_tokens(
    revision: u64,
    date: &str,
    tokens: &BTreeMap<u64, String>,
) -> Document {
    let mut doc = root_update(revision, date);
    let map = tokens
        .iter()
        .map(|(revision, token)| (revision.to_string(), Value::from(token.as_str())))
        .collect();
    doc.insert(fields::BATCH_TOKENS.to_string(), Value::Object(map));
    doc
}

/// Encodes a `table -> encoded ids` delete map as a JSON object.
pub(crate) fn deletes_value(deletes: &BTreeMap<String, Vec<String>>) -> Value {
    let map = deletes
        .iter()
        .map(|(table, ids)| {
            let ids = ids.iter().map(|id| Value::from(id.as_str())).collect();
            (table.clone(), Value::Array(ids))
        })
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use melonsync_store::DocPath;
    use serde_json::json;

    fn snapshot(data: Option<serde_json::Value>) -> Snapshot {
        let data = data.map(|value| match value {
            Value::Object(map) => map,
            _ => panic!("test snapshots are objects"),
        });
        Snapshot::new(DocPath::new("sync/main").unwrap(), data)
    }

    #[test]
    fn missing_document_is_absent() {
        let state = RootState::from_snapshot(&snapshot(None)).unwrap();
        assert_eq!(state, RootState::Absent);
        assert_eq!(state.next_revision(), 1);
        assert_eq!(state.end_revision_exclusive(), 1);
        assert!(state.batch_tokens().is_empty());
    }

    #[test]
    fn document_without_revision_is_absent() {
        let state = RootState::from_snapshot(&snapshot(Some(json!({ "other": 1 })))).unwrap();
        assert_eq!(state, RootState::Absent);
    }

    #[test]
    fn present_root() {
        let state = RootState::from_snapshot(&snapshot(Some(json!({
            "melonLatestRevision": 4,
            "melonLatestDate": "2024-01-01T00:00:00.000Z",
            "melonBatchTokens": { "2": "tok2", "4": "tok4" }
        }))))
        .unwrap();

        assert_eq!(state.next_revision(), 5);
        let tokens = state.batch_tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[&2], "tok2");
        assert_eq!(tokens[&4], "tok4");
    }

    #[test]
    fn missing_tokens_default_to_empty() {
        let state =
            RootState::from_snapshot(&snapshot(Some(json!({ "melonLatestRevision": 1 })))).unwrap();
        assert!(state.batch_tokens().is_empty());
        assert_eq!(state.next_revision(), 2);
    }

    #[test]
    fn corrupt_revision_rejected() {
        for bad in [json!("five"), json!(0), json!(-3), json!(1.5)] {
            let result =
                RootState::from_snapshot(&snapshot(Some(json!({ "melonLatestRevision": bad }))));
            assert!(matches!(result, Err(SyncError::CorruptMetadata { .. })));
        }
    }

    #[test]
    fn corrupt_tokens_rejected() {
        let result = RootState::from_snapshot(&snapshot(Some(json!({
            "melonLatestRevision": 2,
            "melonBatchTokens": { "two": "tok" }
        }))));
        assert!(matches!(result, Err(SyncError::CorruptMetadata { .. })));

        let result = RootState::from_snapshot(&snapshot(Some(json!({
            "melonLatestRevision": 2,
            "melonBatchTokens": [1, 2]
        }))));
        assert!(matches!(result, Err(SyncError::CorruptMetadata { .. })));
    }

    #[test]
    fn root_update_payloads() {
        let doc = root_update(3, "2024-01-01T00:00:00.000Z");
        assert_eq!(doc["melonLatestRevision"], json!(3));
        assert_eq!(doc["melonLatestDate"], json!("2024-01-01T00:00:00.000Z"));
        assert!(doc.get("melonBatchTokens").is_none());

        let mut tokens = BTreeMap::new();
        tokens.insert(3, "tok3".to_string());
        let doc = root_update_with_tokens(3, "2024-01-01T00:00:00.000Z", &tokens);
        assert_eq!(doc["melonBatchTokens"], json!({ "3": "tok3" }));
    }

    #[test]
    fn deletes_value_shape() {
        let mut deletes = BTreeMap::new();
        deletes.insert("entries".to_string(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            deletes_value(&deletes),
            json!({ "entries": ["a", "b"] })
        );
    }
}
