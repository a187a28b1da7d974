//! Memo domain model and annotation wire format.
//!
//! # Responsibility
//! - Define the memo record and its persisted shape.
//! - Keep payload encoding separate from store orchestration.
//!
//! # Invariants
//! - Every memo is identified by a stable `MemoId`.
//! - Deletion is plain absence from the collection; there are no tombstones.

pub mod memo;
pub mod payload;
