//! Host document capability.
//!
//! # Responsibility
//! - Describe the only host surface the core touches: one generic
//!   annotation slot per key, plus document identity.
//! - Provide an in-memory document for tests and headless hosts.
//!
//! # Invariants
//! - Implementations are used from a single thread; methods take `&self`
//!   and rely on interior mutability.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Annotation key under which the memo payload is stored.
pub const ANNOTATION_KEY: &str = "krita_memos_data";
/// Human-readable description stored alongside the payload.
pub const ANNOTATION_DESCRIPTION: &str = "memos_data";

/// Opaque identity of a host document, compared for equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Host-side write failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationError {
    message: String,
}

impl AnnotationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for AnnotationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "annotation write failed: {}", self.message)
    }
}

impl Error for AnnotationError {}

/// Capability a host document exposes to the memo core.
pub trait AnnotationDocument {
    /// Returns raw bytes stored under `key`, or `None` when absent.
    fn read_annotation(&self, key: &str) -> Option<Vec<u8>>;
    /// Stores `bytes` under `key`, replacing any previous value.
    fn write_annotation(
        &self,
        key: &str,
        description: &str,
        bytes: &[u8],
    ) -> Result<(), AnnotationError>;
    /// Identity used to detect whether two handles are the same document.
    fn identity(&self) -> DocumentId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredAnnotation {
    description: String,
    bytes: Vec<u8>,
}

/// In-memory `AnnotationDocument` with write accounting.
#[derive(Debug)]
pub struct InMemoryDocument {
    id: DocumentId,
    annotations: RefCell<HashMap<String, StoredAnnotation>>,
    writes: Cell<usize>,
    fail_writes: Cell<bool>,
}

impl InMemoryDocument {
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            annotations: RefCell::new(HashMap::new()),
            writes: Cell::new(0),
            fail_writes: Cell::new(false),
        }
    }

    /// Seeds raw bytes under `key` without counting a write.
    pub fn with_annotation(self, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.annotations.borrow_mut().insert(
            key.to_string(),
            StoredAnnotation {
                description: String::new(),
                bytes: bytes.into(),
            },
        );
        self
    }

    /// Returns a copy of the raw bytes under `key`.
    pub fn annotation(&self, key: &str) -> Option<Vec<u8>> {
        self.annotations
            .borrow()
            .get(key)
            .map(|stored| stored.bytes.clone())
    }

    /// Returns the description stored with `key`.
    pub fn annotation_description(&self, key: &str) -> Option<String> {
        self.annotations
            .borrow()
            .get(key)
            .map(|stored| stored.description.clone())
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Makes subsequent writes fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl AnnotationDocument for InMemoryDocument {
    fn read_annotation(&self, key: &str) -> Option<Vec<u8>> {
        self.annotation(key)
    }

    fn write_annotation(
        &self,
        key: &str,
        description: &str,
        bytes: &[u8],
    ) -> Result<(), AnnotationError> {
        if self.fail_writes.get() {
            return Err(AnnotationError::new(format!(
                "document `{}` is read-only",
                self.id
            )));
        }
        self.annotations.borrow_mut().insert(
            key.to_string(),
            StoredAnnotation {
                description: description.to_string(),
                bytes: bytes.to_vec(),
            },
        );
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn identity(&self) -> DocumentId {
        self.id.clone()
    }
}
