//! Store layer over the host document annotation slot.
//!
//! # Responsibility
//! - Keep payload I/O details out of the editor and UI layers.
//!
//! # Invariants
//! - Every mutation rewrites the whole collection; there is no per-memo
//!   persistence.

pub mod memo_store;
