//! Core domain logic for document-embedded memos.
//! This crate is the single source of truth for memo invariants.

pub mod clock;
pub mod config;
pub mod document;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EditorConfig, DEFAULT_AUTOSAVE_DELAY_MS, DEFAULT_LOG_DEDUPE_WINDOW_MS};
pub use document::{
    AnnotationDocument, AnnotationError, DocumentId, InMemoryDocument, ANNOTATION_DESCRIPTION,
    ANNOTATION_KEY,
};
pub use logging::{default_log_level, init_logging, logging_status, MessageDeduper};
pub use model::memo::{Memo, MemoId, MemoRecord, MemoRecordError};
pub use model::payload::{
    decode_payload, encode_payload, DecodedPayload, PayloadError, PAYLOAD_VERSION,
};
pub use service::autosave::DebounceTimer;
pub use service::memo_editor::{normalize_tag, AutosaveOutcome, EditState, MemoEditor};
pub use store::memo_store::{
    LoadOutcome, MemoQuery, MemoStore, SaveOutcome, StoreError, StoreResult,
};

/// Minimal health-check API for host integration probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
