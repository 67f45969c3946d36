//! Wire-contract field and collection names.
//!
//! These names are part of the persisted layout and must not change.

/// Root and side-batch field: the most recently committed revision.
pub const LATEST_REVISION: &str = "melonLatestRevision";

/// Root and side-batch field: advisory RFC 3339 date of the last push.
pub const LATEST_DATE: &str = "melonLatestDate";

/// Root field: revision-string to side-batch token mapping.
pub const BATCH_TOKENS: &str = "melonBatchTokens";

/// Record field: the revision the record was written at. Indexed.
pub const RECORD_REVISION: &str = "melonFireRevision";

/// Legacy record field, stripped on read.
pub const RECORD_CHANGE: &str = "melonFireChange";

/// Collection of side-batch documents under the root.
pub const BATCHES_COLLECTION: &str = "melonBatches";

/// Collection of inline-push delete records under the root.
pub const DELETES_COLLECTION: &str = "melonDeletes";

/// Delete-record field: the revision the deletes belong to. Indexed.
pub const DELETE_REVISION: &str = "revision";

/// Delete-record and side-batch field: table name to encoded row-ids.
pub const DELETES: &str = "deletes";

/// Record field holding the logical (un-encoded) row id.
pub const ROW_ID: &str = "id";

/// Adapter bookkeeping field, never persisted.
pub const STATUS: &str = "_status";

/// Adapter bookkeeping field, never persisted.
pub const CHANGED: &str = "_changed";
