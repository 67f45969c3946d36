//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document key or path segment is not legal.
    #[error("invalid document key: {key:?}")]
    InvalidKey {
        /// The offending key.
        key: String,
    },

    /// A transaction or batch exceeded the store's write limit.
    #[error("too many writes in one commit: {count} > limit {limit}")]
    TooManyWrites {
        /// Number of queued operations.
        count: usize,
        /// The store's per-commit cap.
        limit: usize,
    },

    /// The backend rejected the operation.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates an `Unavailable` error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::TooManyWrites {
            count: 501,
            limit: 500,
        };
        assert!(err.to_string().contains("501"));
        assert!(err.to_string().contains("500"));

        let err = StoreError::InvalidKey {
            key: "a/b".to_string(),
        };
        assert!(err.to_string().contains("a/b"));
    }
}
