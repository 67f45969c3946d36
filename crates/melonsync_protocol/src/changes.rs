//! Changeset shapes exchanged with the local database adapter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A row as the local adapter emits it: a schemaless JSON object with at
/// least a string `id` field.
pub type Row = Map<String, Value>;

/// Changes to one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableChanges {
    /// Rows created locally since the last push.
    #[serde(default)]
    pub created: Vec<Row>,
    /// Rows updated locally since the last push. Rows are complete, not
    /// field-level diffs.
    #[serde(default)]
    pub updated: Vec<Row>,
    /// Logical ids of rows deleted locally.
    #[serde(default)]
    pub deleted: Vec<String>,
}

impl TableChanges {
    /// Returns true if the table has no changes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Number of record writes this table contributes to a push.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.created.len() + self.updated.len()
    }

    /// Adds created rows.
    #[must_use]
    pub fn with_created(mut self, rows: Vec<Row>) -> Self {
        self.created = rows;
        self
    }

    /// Adds updated rows.
    #[must_use]
    pub fn with_updated(mut self, rows: Vec<Row>) -> Self {
        self.updated = rows;
        self
    }

    /// Adds deleted ids.
    #[must_use]
    pub fn with_deleted(mut self, ids: Vec<String>) -> Self {
        self.deleted = ids;
        self
    }
}

/// A full changeset: table name to per-table changes, in table order.
pub type Changeset = BTreeMap<String, TableChanges>;

/// Arguments of a pull operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullArgs {
    /// The exclusive revision watermark of the caller's previous pull, or
    /// `None` for a full-history pull.
    pub last_pulled_at: Option<u64>,
}

impl PullArgs {
    /// Pull everything after `last_pulled_at`.
    #[must_use]
    pub fn since(last_pulled_at: u64) -> Self {
        Self {
            last_pulled_at: Some(last_pulled_at),
        }
    }

    /// Pull the full history.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }
}

/// Result of a pull operation.
///
/// All returned rows arrive as `updated` - the adapter must be configured
/// with `sendCreatedAsUpdated`, which lets a full-history pull flow
/// through as a single update stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Merged remote changes since the watermark.
    pub changes: Changeset,
    /// The new watermark: the exclusive end of the pulled revision range.
    pub timestamp: u64,
}

/// Arguments of a push operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushArgs {
    /// The watermark returned by the caller's most recent pull. Must
    /// equal the next revision to write, or the push is stale.
    pub last_pulled_at: u64,
    /// The local changeset to submit.
    pub changes: Changeset,
}

impl PushArgs {
    /// Creates push arguments.
    #[must_use]
    pub fn new(last_pulled_at: u64, changes: Changeset) -> Self {
        Self {
            last_pulled_at,
            changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: &str, data: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(id));
        row.insert("data".to_string(), json!(data));
        row
    }

    #[test]
    fn table_changes_counts() {
        let changes = TableChanges::default()
            .with_created(vec![row("a", "1"), row("b", "2")])
            .with_updated(vec![row("c", "3")])
            .with_deleted(vec!["d".to_string()]);

        assert!(!changes.is_empty());
        assert_eq!(changes.write_count(), 3);
    }

    #[test]
    fn empty_table_changes() {
        let changes = TableChanges::default();
        assert!(changes.is_empty());
        assert_eq!(changes.write_count(), 0);
    }

    #[test]
    fn push_args_serde_shape() {
        let mut changeset = Changeset::new();
        changeset.insert(
            "entries".to_string(),
            TableChanges::default().with_created(vec![row("aaa", "hello")]),
        );
        let args = PushArgs::new(1, changeset);

        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(value["lastPulledAt"], json!(1));
        assert_eq!(value["changes"]["entries"]["created"][0]["id"], json!("aaa"));

        let back: PushArgs = serde_json::from_value(value).unwrap();
        assert_eq!(back, args);
    }

    #[test]
    fn pull_args_serde_shape() {
        let value = serde_json::to_value(PullArgs::since(3)).unwrap();
        assert_eq!(value["lastPulledAt"], json!(3));

        let null: PullArgs = serde_json::from_value(json!({ "lastPulledAt": null })).unwrap();
        assert_eq!(null, PullArgs::full());
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let changes: TableChanges =
            serde_json::from_value(json!({ "created": [{"id": "x"}] })).unwrap();
        assert_eq!(changes.created.len(), 1);
        assert!(changes.updated.is_empty());
        assert!(changes.deleted.is_empty());
    }
}
