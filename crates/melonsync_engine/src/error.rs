//! Error types for the sync engine.

use melonsync_protocol::IdCodecError;
use melonsync_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The caller's watermark disagrees with the next revision to write.
    /// Another writer committed since the caller's last pull, or the
    /// caller dropped a pull result. Nothing was mutated.
    #[error("out of sync: caller watermark {watermark}, next revision {next_revision}")]
    OutOfSync {
        /// The caller's `lastPulledAt`.
        watermark: u64,
        /// The revision the root says comes next.
        next_revision: u64,
    },

    /// The remote store rejected an operation.
    #[error("remote store unavailable: {0}")]
    Store(#[from] StoreError),

    /// A side-batch stage commit failed. Staged documents are orphaned
    /// but unreachable: no root references them.
    #[error("side-batch stage failed: {source}")]
    StageFailed {
        /// The underlying store error.
        source: StoreError,
    },

    /// The side-batch integrate transaction failed. The staged side-batch
    /// was rolled back.
    #[error("side-batch integrate failed: {source}")]
    IntegrateFailed {
        /// The underlying store error.
        source: StoreError,
    },

    /// Rollback of a staged side-batch failed after an integrate failure.
    /// Operator cleanup is required.
    #[error("rollback failed after integrate failure: integrate: {integrate}; rollback: {rollback}")]
    RollbackFailed {
        /// The error that failed the integrate phase.
        integrate: Box<SyncError>,
        /// The error that failed the rollback itself.
        rollback: StoreError,
    },

    /// A pushed row carries no string `id` field.
    #[error("row in table {table:?} has no string id")]
    MissingRowId {
        /// The table the row belongs to.
        table: String,
    },

    /// The root or a side-batch header holds metadata the engine cannot
    /// interpret.
    #[error("revision metadata corrupt: {message}")]
    CorruptMetadata {
        /// Description of the problem.
        message: String,
    },

    /// A document key could not be decoded back to a logical row id.
    #[error("id codec error: {0}")]
    Id(#[from] IdCodecError),
}

impl SyncError {
    /// Creates a `CorruptMetadata` error.
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptMetadata {
            message: message.into(),
        }
    }

    /// Returns true if this error is the stale-write signal, which the
    /// caller resolves by pulling again before re-pushing.
    #[must_use]
    pub fn is_out_of_sync(&self) -> bool {
        match self {
            SyncError::OutOfSync { .. } => true,
            SyncError::RollbackFailed { integrate, .. } => integrate.is_out_of_sync(),
            _ => false,
        }
    }
}
