//! # MelonSync Protocol
//!
//! Wire contract and adapter-facing types for MelonSync.
//!
//! This crate provides:
//! - The changeset shapes exchanged with the local database adapter
//! - The fixed wire field and collection names of the remote layout
//! - The document-key codec for logical row ids
//! - Record shaping at the store boundary (reserved-field stripping,
//!   revision stamping)
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changes;
pub mod fields;
mod ids;
pub mod record;

pub use changes::{Changeset, PullArgs, PullResponse, PushArgs, Row, TableChanges};
pub use ids::{decode_id, encode_id, IdCodecError};
