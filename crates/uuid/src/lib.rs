//! Record and sub-record identifiers.
//!
//! Every ward and patient document is keyed by a store-assigned identifier in a *canonical*
//! form: **32 lowercase hexadecimal characters** (no hyphens). Embedded sub-records (notes,
//! appointments, biopsy results, reviews) use a time-prefixed identifier so they sort by
//! creation time while remaining globally unique.
//!
//! This crate provides:
//! - [`RecordId`], a wrapper that *guarantees* the canonical format once constructed, plus the
//!   sharded file layout used when documents are persisted to disk.
//! - [`TimestampUuid`], the `YYYYMMDDTHHMMSS.mmmZ-<canonical uuid>` sub-record identifier.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Non-canonical values (uppercase, hyphenated, wrong length, non-hex) are rejected by
//! [`RecordId::parse`].
//!
//! ## Sharded file layout
//! For a canonical id `u`, a persisted document lives at:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>.json`
//!
//! This keeps any single directory from growing without bound.

mod service;

pub use service::{RecordId, TimestampUuid, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
