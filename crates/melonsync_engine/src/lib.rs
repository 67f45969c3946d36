//! # MelonSync Engine
//!
//! Client-side pull/push revision engine for MelonSync.
//!
//! The engine reconciles a local, row-oriented database against a remote
//! hierarchical document store. The remote copy is always a
//! crash-consistent image of some past local state, despite the remote
//! backend accepting at most W writes per transaction.
//!
//! This crate provides:
//! - [`SyncEngine`] - pull and push operations bound to one sync context
//! - [`BatchWriter`] - streams unbounded write sets through W-sized batches
//! - [`RootState`] - revision metadata decoded from the root document
//! - Counter-based ordering: revisions replace wall-clock timestamps
//!
//! A push either fits a single remote transaction (the inline path) or is
//! staged into a private side-batch document and integrated with one
//! final transaction (the side-batch path). A pull walks the revision
//! range across the root and all side-batches, producing one merged
//! changeset.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod delete_refs;
mod engine;
mod error;
mod pull;
mod push;
mod retry;
mod root;
mod writer;

pub use delete_refs::{find_delete_refs, DeleteRef, DeleteRefs};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use retry::with_single_retry;
pub use root::RootState;
pub use writer::BatchWriter;
