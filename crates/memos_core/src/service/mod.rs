//! Edit-session services on top of the memo store.
//!
//! # Responsibility
//! - Decide when in-progress edits become durable memo records.
//! - Keep UI layers free of debounce and undo bookkeeping.

pub mod autosave;
pub mod memo_editor;
