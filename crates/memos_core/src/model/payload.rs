//! Annotation payload envelope.
//!
//! # Responsibility
//! - Encode the whole memo collection as one `{version, memos}` JSON blob.
//! - Decode blobs of any version field by field.
//!
//! # Invariants
//! - Encoding always writes `PAYLOAD_VERSION`.
//! - A malformed record is skipped on its own; only a blob that is not a
//!   UTF-8 JSON object fails as a whole.

use crate::clock::Clock;
use crate::model::memo::{Memo, MemoRecord};
use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Version written into every payload.
pub const PAYLOAD_VERSION: u32 = 1;

#[derive(Serialize)]
struct PayloadEnvelope {
    version: u32,
    memos: Vec<MemoRecord>,
}

/// Result of decoding one annotation blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    /// Version found in the blob, `None` when absent or not an integer.
    pub version: Option<u64>,
    /// Memos in stored order.
    pub memos: Vec<Memo>,
    /// Number of records dropped because they failed to decode.
    pub skipped: usize,
}

/// Whole-payload decoding failure.
#[derive(Debug)]
pub enum PayloadError {
    InvalidUtf8(std::str::Utf8Error),
    InvalidJson(serde_json::Error),
    NotAnObject,
}

impl Display for PayloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUtf8(err) => write!(f, "memo payload is not valid UTF-8: {err}"),
            Self::InvalidJson(err) => write!(f, "memo payload is not valid JSON: {err}"),
            Self::NotAnObject => write!(f, "memo payload must be a JSON object"),
        }
    }
}

impl Error for PayloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidUtf8(err) => Some(err),
            Self::InvalidJson(err) => Some(err),
            Self::NotAnObject => None,
        }
    }
}

impl From<std::str::Utf8Error> for PayloadError {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::InvalidUtf8(value)
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidJson(value)
    }
}

/// Serializes memos into the versioned UTF-8 JSON envelope.
pub fn encode_payload(memos: &[Memo]) -> Result<Vec<u8>, serde_json::Error> {
    let envelope = PayloadEnvelope {
        version: PAYLOAD_VERSION,
        memos: memos.iter().map(Memo::to_record).collect(),
    };
    serde_json::to_vec(&envelope)
}

/// Parses an annotation blob.
///
/// Unknown `version` values are not rejected. A missing or non-array
/// `memos` field decodes as an empty collection.
pub fn decode_payload(bytes: &[u8], clock: &dyn Clock) -> Result<DecodedPayload, PayloadError> {
    let text = std::str::from_utf8(bytes)?;
    let root: Value = serde_json::from_str(text)?;
    let object = root.as_object().ok_or(PayloadError::NotAnObject)?;

    let version = object.get("version").and_then(Value::as_u64);
    if version.is_some_and(|value| value != u64::from(PAYLOAD_VERSION)) {
        warn!(
            "event=payload_decode module=model status=unknown_version version={}",
            version.unwrap_or_default()
        );
    }

    let mut memos = Vec::new();
    let mut skipped = 0;
    if let Some(records) = object.get("memos").and_then(Value::as_array) {
        for (index, record) in records.iter().enumerate() {
            match Memo::from_value(record, clock) {
                Ok(memo) => memos.push(memo),
                Err(err) => {
                    skipped += 1;
                    warn!(
                        "event=payload_decode module=model status=skip_record index={} error={}",
                        index, err
                    );
                }
            }
        }
    }

    Ok(DecodedPayload {
        version,
        memos,
        skipped,
    })
}
