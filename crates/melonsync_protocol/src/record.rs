//! Record shaping at the store boundary.
//!
//! Persisted records follow a strict write shape: the adapter's
//! bookkeeping fields are never stored, and every record carries the
//! revision it was written at. Reads are lenient - legacy data may still
//! carry long-retired fields, which are stripped before a row reaches the
//! adapter.

use crate::changes::Row;
use crate::fields;
use serde_json::Value;

/// Returns the logical row id, if the row carries a string `id` field.
#[must_use]
pub fn row_id(row: &Row) -> Option<&str> {
    row.get(fields::ROW_ID)?.as_str()
}

/// Prepares a row for persistence at `revision`: strips the adapter's
/// bookkeeping fields and stamps the revision.
#[must_use]
pub fn prepare_for_write(row: &Row, revision: u64) -> Row {
    let mut doc = row.clone();
    doc.remove(fields::STATUS);
    doc.remove(fields::CHANGED);
    doc.insert(fields::RECORD_REVISION.to_string(), Value::from(revision));
    doc
}

/// Strips stored and legacy bookkeeping fields from a document read back
/// from the store. Tolerates fields that were never written.
pub fn strip_on_read(doc: &mut Row) {
    doc.remove(fields::STATUS);
    doc.remove(fields::CHANGED);
    doc.remove(fields::RECORD_CHANGE);
    doc.remove(fields::RECORD_REVISION);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn row_id_extraction() {
        let r = row(&[("id", json!("aaa")), ("data", json!("x"))]);
        assert_eq!(row_id(&r), Some("aaa"));

        let no_id = row(&[("data", json!("x"))]);
        assert_eq!(row_id(&no_id), None);

        let numeric_id = row(&[("id", json!(7))]);
        assert_eq!(row_id(&numeric_id), None);
    }

    #[test]
    fn write_shape_is_strict() {
        let r = row(&[
            ("id", json!("aaa")),
            ("data", json!("hello")),
            ("_status", json!("updated")),
            ("_changed", json!("data")),
        ]);

        let doc = prepare_for_write(&r, 3);
        assert!(doc.get("_status").is_none());
        assert!(doc.get("_changed").is_none());
        assert_eq!(doc["melonFireRevision"], json!(3));
        assert_eq!(doc["id"], json!("aaa"));
        assert_eq!(doc["data"], json!("hello"));
        // The source row is untouched.
        assert!(r.contains_key("_status"));
    }

    #[test]
    fn read_shape_is_lenient() {
        let mut doc = row(&[
            ("id", json!("aaa")),
            ("data", json!("hello")),
            ("_status", json!("synced")),
            ("_changed", json!("")),
            ("melonFireChange", json!("updated")),
            ("melonFireRevision", json!(5)),
        ]);

        strip_on_read(&mut doc);
        assert_eq!(doc, row(&[("id", json!("aaa")), ("data", json!("hello"))]));
    }

    #[test]
    fn strip_on_clean_document_is_noop() {
        let mut doc = row(&[("id", json!("aaa"))]);
        strip_on_read(&mut doc);
        assert_eq!(doc, row(&[("id", json!("aaa"))]));
    }
}
