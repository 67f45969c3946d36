//! # MelonSync Store
//!
//! Remote document-store abstraction for MelonSync.
//!
//! This crate provides the lowest-level I/O seam of the sync engine: a
//! hierarchical document store with single-document reads, bounded atomic
//! transactions, bounded write batches, and range queries over an indexed
//! numeric field. The engine never talks to a concrete backend directly -
//! it is generic over [`DocumentStore`].
//!
//! ## Design Principles
//!
//! - Documents are schemaless JSON objects; the store does not interpret
//!   field contents beyond the indexed query field
//! - Transactions and batches are atomic and capped at the store's
//!   [`write_limit`](DocumentStore::write_limit) operations
//! - Document keys never contain `/`; callers encode ids before they
//!   become keys
//! - A single logical writer is assumed; the store does not arbitrate
//!   concurrent committers
//!
//! ## Available Backends
//!
//! - [`MemoryStore`] - For tests and ephemeral use

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod path;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, DEFAULT_WRITE_LIMIT};
pub use path::{CollectionPath, DocPath};
pub use store::{Document, DocumentStore, Snapshot, Transaction, WriteBatch, WriteOp};
