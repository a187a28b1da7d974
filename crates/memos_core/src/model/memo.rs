//! Memo domain model.
//!
//! # Responsibility
//! - Define the canonical note record attached to a host document.
//! - Convert between the in-memory record and its persisted wire shape.
//!
//! # Invariants
//! - `uid` is stable and never reused for another memo.
//! - `created <= modified` after every constructor and mutator.
//! - A persisted record without `content` is rejected; every other field
//!   falls back to a fresh value so older payloads keep loading.

use crate::clock::Clock;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one memo.
pub type MemoId = Uuid;

const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// One user note: free text plus ordered hashtags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memo {
    /// Stable memo identity.
    uid: MemoId,
    /// Free text body; may be empty only before the first commit.
    content: String,
    /// Ordered hashtags without the leading `#`.
    hashtags: Vec<String>,
    /// Creation time.
    created: DateTime<Utc>,
    /// Last content or hashtag change; never earlier than `created`.
    modified: DateTime<Utc>,
}

/// Persisted wire shape of one memo.
///
/// Field order matches the annotation payload written by earlier releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoRecord {
    pub uid: String,
    pub content: String,
    pub hashtags: Vec<String>,
    pub created: String,
    pub modified: String,
}

/// Per-record decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoRecordError {
    /// Record is not a JSON object.
    NotAnObject,
    /// Required `content` field is absent or not a string.
    MissingContent,
}

impl Display for MemoRecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "memo record must be an object"),
            Self::MissingContent => write!(f, "memo record is missing string field `content`"),
        }
    }
}

impl Error for MemoRecordError {}

impl Memo {
    /// Creates a memo with a generated id, stamped with the system time.
    pub fn new(content: impl Into<String>, hashtags: Vec<String>) -> Self {
        Self::new_at(content, hashtags, Utc::now())
    }

    /// Creates a memo with a generated id, `created == modified == now`.
    pub fn new_at(content: impl Into<String>, hashtags: Vec<String>, now: DateTime<Utc>) -> Self {
        Self::with_id(Uuid::new_v4(), content, hashtags, now, now)
    }

    /// Creates a memo with caller-provided identity and creation time.
    ///
    /// `modified` is set to `now`, clamped so it never precedes `created`.
    pub fn with_id(
        uid: MemoId,
        content: impl Into<String>,
        hashtags: Vec<String>,
        created: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uid,
            content: content.into(),
            hashtags,
            created,
            modified: now.max(created),
        }
    }

    pub fn uid(&self) -> MemoId {
        self.uid
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Replaces content and bumps `modified`.
    pub fn set_content(&mut self, content: impl Into<String>, now: DateTime<Utc>) {
        self.content = content.into();
        self.touch(now);
    }

    /// Replaces hashtags and bumps `modified`.
    pub fn set_hashtags(&mut self, hashtags: Vec<String>, now: DateTime<Utc>) {
        self.hashtags = hashtags;
        self.touch(now);
    }

    /// Replaces content and hashtags as one mutation.
    pub fn replace(
        &mut self,
        content: impl Into<String>,
        hashtags: Vec<String>,
        now: DateTime<Utc>,
    ) {
        self.content = content.into();
        self.hashtags = hashtags;
        self.touch(now);
    }

    /// Returns whether this memo contains `tag` exactly (case-sensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.hashtags.iter().any(|value| value == tag)
    }

    /// Case-insensitive substring match against content or any hashtag.
    ///
    /// An empty query matches every memo.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        if self.content.to_lowercase().contains(&needle) {
            return true;
        }
        self.hashtags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
    }

    /// Converts into the persisted wire shape.
    pub fn to_record(&self) -> MemoRecord {
        MemoRecord {
            uid: self.uid.to_string(),
            content: self.content.clone(),
            hashtags: self.hashtags.clone(),
            created: format_timestamp(self.created),
            modified: format_timestamp(self.modified),
        }
    }

    /// Builds a memo from a fully-populated wire record.
    pub fn from_record(record: &MemoRecord, clock: &dyn Clock) -> Self {
        let now = clock.now();
        let uid = parse_uid(Some(record.uid.as_str()));
        let created = parse_timestamp(Some(record.created.as_str()), "created").unwrap_or(now);
        let modified = parse_timestamp(Some(record.modified.as_str()), "modified").unwrap_or(now);
        Self::with_id(uid, record.content.clone(), record.hashtags.clone(), created, modified)
    }

    /// Best-effort decode of one JSON record of any payload version.
    ///
    /// # Errors
    /// - `NotAnObject` when `value` is not a JSON object.
    /// - `MissingContent` when `content` is absent or not a string.
    pub fn from_value(value: &Value, clock: &dyn Clock) -> Result<Self, MemoRecordError> {
        let object = value.as_object().ok_or(MemoRecordError::NotAnObject)?;
        let content = object
            .get("content")
            .and_then(Value::as_str)
            .ok_or(MemoRecordError::MissingContent)?;

        let hashtags: Vec<String> = object
            .get("hashtags")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let now = clock.now();
        let uid = parse_uid(object.get("uid").and_then(Value::as_str));
        let created = parse_timestamp(object.get("created").and_then(Value::as_str), "created")
            .unwrap_or(now);
        let modified = parse_timestamp(object.get("modified").and_then(Value::as_str), "modified")
            .unwrap_or(now);

        Ok(Self::with_id(uid, content, hashtags, created, modified))
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.modified = now.max(self.created);
    }
}

/// Formats a timestamp as RFC 3339 UTC, keeping sub-second precision.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses RFC 3339, falling back to naive ISO-8601 interpreted as UTC.
pub fn parse_timestamp_str(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, NAIVE_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_timestamp(value: Option<&str>, field: &'static str) -> Option<DateTime<Utc>> {
    let raw = value?;
    let parsed = parse_timestamp_str(raw);
    if parsed.is_none() {
        warn!("event=memo_decode module=model status=fallback field={field} reason=bad_timestamp");
    }
    parsed
}

fn parse_uid(value: Option<&str>) -> MemoId {
    match value {
        Some(raw) => match Uuid::parse_str(raw.trim()) {
            Ok(uid) => uid,
            Err(_) => {
                warn!("event=memo_decode module=model status=fallback field=uid reason=bad_uuid");
                Uuid::new_v4()
            }
        },
        None => Uuid::new_v4(),
    }
}
