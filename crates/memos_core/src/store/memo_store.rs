//! Document-scoped memo store.
//!
//! # Responsibility
//! - Own the in-memory memo collection of the currently bound document.
//! - Load and save the whole collection through the document annotation slot.
//! - Provide CRUD and query entry points for the editor and UI layers.
//!
//! # Invariants
//! - At most one document is bound; binding discards the previous collection.
//! - The store never owns the document; a dropped document counts as unbound.
//! - Load and save failures are logged and absorbed, never propagated.
//! - Collection order is insertion order, independent of timestamps.

use crate::clock::{Clock, SystemClock};
use crate::document::{AnnotationDocument, DocumentId, ANNOTATION_DESCRIPTION, ANNOTATION_KEY};
use crate::model::memo::{Memo, MemoId};
use crate::model::payload::{decode_payload, encode_payload};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::{Rc, Weak};

pub type StoreResult<T> = Result<T, StoreError>;

/// Soft store error for operations addressing a specific memo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(MemoId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(uid) => write!(f, "memo not found: {uid}"),
        }
    }
}

impl Error for StoreError {}

/// What happened when the collection was written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Payload written to the bound document.
    Saved,
    /// No live document bound; nothing written.
    Unbound,
    /// Encoding or host write failed; in-memory state kept.
    Failed,
}

/// What happened when the collection was read from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No live document bound.
    Unbound,
    /// The annotation key is absent or empty.
    Missing,
    /// The payload could not be parsed at all.
    Corrupt,
    /// Payload decoded; `skipped` malformed records were dropped.
    Loaded { loaded: usize, skipped: usize },
}

/// Combined list filter used by memo list views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoQuery {
    /// Case-insensitive text query; empty or `None` means no text filter.
    pub text: Option<String>,
    /// Exact hashtag filter; empty or `None` means no tag filter.
    pub tag: Option<String>,
    /// Reverse creation order (latest memo first).
    pub newest_first: bool,
}

struct BoundDocument {
    id: DocumentId,
    handle: Weak<dyn AnnotationDocument>,
}

/// In-memory memo collection bound to one host document.
pub struct MemoStore {
    /// Memos in insertion order.
    memos: Vec<Memo>,
    /// Weakly held document the collection is loaded from and saved to.
    doc: Option<BoundDocument>,
    /// Time source for decode fallbacks and `modified` bumps.
    clock: Rc<dyn Clock>,
}

impl Default for MemoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoStore {
    /// Creates an empty, unbound store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Rc::new(SystemClock))
    }

    /// Creates an empty, unbound store with an injected clock.
    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self {
            memos: Vec::new(),
            doc: None,
            clock,
        }
    }

    /// Binds to `document` and reloads its memos.
    ///
    /// Memos of a previously bound document are discarded, not merged.
    ///
    /// Only a weak handle is kept: the caller must keep `document` alive,
    /// otherwise later saves report `SaveOutcome::Unbound`.
    pub fn bind<D: AnnotationDocument + 'static>(&mut self, document: &Rc<D>) -> LoadOutcome {
        let id = document.identity();
        let handle = Rc::downgrade(document);
        let handle: Weak<dyn AnnotationDocument> = handle;
        info!("event=store_bind module=store status=ok document={id}");
        self.doc = Some(BoundDocument { id, handle });
        self.load()
    }

    /// Drops the binding and clears the collection.
    pub fn unbind(&mut self) {
        if let Some(bound) = self.doc.take() {
            info!("event=store_unbind module=store status=ok document={}", bound.id);
        }
        self.memos.clear();
    }

    /// Returns whether a live document is bound.
    pub fn is_bound(&self) -> bool {
        self.document().is_some()
    }

    /// Identity of the bound document, if any.
    pub fn bound_identity(&self) -> Option<&DocumentId> {
        self.doc.as_ref().map(|bound| &bound.id)
    }

    /// Returns whether the store is bound to the document identified by `id`.
    pub fn is_bound_to(&self, id: &DocumentId) -> bool {
        self.bound_identity() == Some(id)
    }

    /// Replaces the collection with the bound document's payload.
    ///
    /// Never fails: missing or corrupt data yields an empty collection.
    pub fn load(&mut self) -> LoadOutcome {
        let Some(document) = self.document() else {
            self.memos.clear();
            return LoadOutcome::Unbound;
        };

        let bytes = match document.read_annotation(ANNOTATION_KEY) {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                self.memos.clear();
                debug!("event=store_load module=store status=missing");
                return LoadOutcome::Missing;
            }
        };

        match decode_payload(&bytes, self.clock.as_ref()) {
            Ok(decoded) => {
                let loaded = decoded.memos.len();
                self.memos = decoded.memos;
                info!(
                    "event=store_load module=store status=ok loaded={} skipped={} bytes={}",
                    loaded,
                    decoded.skipped,
                    bytes.len()
                );
                LoadOutcome::Loaded {
                    loaded,
                    skipped: decoded.skipped,
                }
            }
            Err(err) => {
                self.memos.clear();
                error!(
                    "event=store_load module=store status=error error_code=payload_corrupt bytes={} error={}",
                    bytes.len(),
                    err
                );
                LoadOutcome::Corrupt
            }
        }
    }

    /// Writes the whole collection to the bound document.
    ///
    /// A failed write is logged and leaves memory untouched; the next
    /// successful save persists the full state again.
    pub fn save(&self) -> SaveOutcome {
        let Some(document) = self.document() else {
            debug!("event=store_save module=store status=skipped reason=unbound");
            return SaveOutcome::Unbound;
        };

        let bytes = match encode_payload(&self.memos) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(
                    "event=store_save module=store status=error error_code=encode_failed error={}",
                    err
                );
                return SaveOutcome::Failed;
            }
        };

        match document.write_annotation(ANNOTATION_KEY, ANNOTATION_DESCRIPTION, &bytes) {
            Ok(()) => {
                debug!(
                    "event=store_save module=store status=ok count={} bytes={}",
                    self.memos.len(),
                    bytes.len()
                );
                SaveOutcome::Saved
            }
            Err(err) => {
                error!(
                    "event=store_save module=store status=error error_code=write_failed count={} error={}",
                    self.memos.len(),
                    err
                );
                SaveOutcome::Failed
            }
        }
    }

    /// Appends `memo` and saves.
    pub fn add(&mut self, memo: Memo) -> SaveOutcome {
        debug!("event=memo_add module=store uid={}", memo.uid());
        self.memos.push(memo);
        self.save()
    }

    /// Replaces content and hashtags of the memo identified by `uid`.
    ///
    /// # Errors
    /// - `StoreError::NotFound` when no such memo exists; nothing is saved.
    pub fn update(
        &mut self,
        uid: MemoId,
        content: impl Into<String>,
        hashtags: Vec<String>,
    ) -> StoreResult<SaveOutcome> {
        let now = self.clock.now();
        let Some(memo) = self.memos.iter_mut().find(|memo| memo.uid() == uid) else {
            warn!("event=memo_update module=store status=not_found uid={uid}");
            return Err(StoreError::NotFound(uid));
        };
        memo.replace(content, hashtags, now);
        debug!("event=memo_update module=store status=ok uid={uid}");
        Ok(self.save())
    }

    /// Removes the memo identified by `uid` and saves.
    ///
    /// Returns the removed memo; an unknown `uid` is not an error.
    pub fn delete(&mut self, uid: MemoId) -> Option<Memo> {
        let removed = self
            .memos
            .iter()
            .position(|memo| memo.uid() == uid)
            .map(|index| self.memos.remove(index));
        debug!(
            "event=memo_delete module=store uid={} found={}",
            uid,
            removed.is_some()
        );
        self.save();
        removed
    }

    /// Re-inserts a previously removed memo at the end and saves.
    pub fn restore(&mut self, memo: Memo) -> SaveOutcome {
        debug!("event=memo_restore module=store uid={}", memo.uid());
        self.memos.push(memo);
        self.save()
    }

    pub fn get(&self, uid: MemoId) -> Option<&Memo> {
        self.memos.iter().find(|memo| memo.uid() == uid)
    }

    /// Memos in creation order.
    pub fn memos(&self) -> &[Memo] {
        &self.memos
    }

    pub fn len(&self) -> usize {
        self.memos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memos.is_empty()
    }

    /// Memos matching `query` in creation order; empty query returns all.
    pub fn search(&self, query: &str) -> Vec<&Memo> {
        if query.is_empty() {
            return self.memos.iter().collect();
        }
        self.memos.iter().filter(|memo| memo.matches(query)).collect()
    }

    /// Memos carrying `tag` exactly; empty tag returns all.
    pub fn filter_by_tag(&self, tag: &str) -> Vec<&Memo> {
        if tag.is_empty() {
            return self.memos.iter().collect();
        }
        self.memos.iter().filter(|memo| memo.has_tag(tag)).collect()
    }

    /// All hashtags across memos, deduplicated and sorted.
    pub fn list_tags(&self) -> Vec<String> {
        self.memos
            .iter()
            .flat_map(|memo| memo.hashtags().iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Applies text and tag filters together.
    pub fn query(&self, query: &MemoQuery) -> Vec<&Memo> {
        let text = query.text.as_deref().unwrap_or_default();
        let tag = query.tag.as_deref().unwrap_or_default();
        let mut items: Vec<&Memo> = self
            .memos
            .iter()
            .filter(|memo| text.is_empty() || memo.matches(text))
            .filter(|memo| tag.is_empty() || memo.has_tag(tag))
            .collect();
        if query.newest_first {
            items.reverse();
        }
        items
    }

    fn document(&self) -> Option<Rc<dyn AnnotationDocument>> {
        self.doc.as_ref().and_then(|bound| bound.handle.upgrade())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoQuery, MemoStore};
    use crate::model::memo::Memo;

    fn store_with(memos: &[(&str, &[&str])]) -> MemoStore {
        let mut store = MemoStore::new();
        for (content, tags) in memos {
            let tags = tags.iter().map(|tag| tag.to_string()).collect();
            store.add(Memo::new(*content, tags));
        }
        store
    }

    #[test]
    fn query_combines_text_and_tag_filters() {
        let store = store_with(&[
            ("castle sketch", &["ref"]),
            ("castle colors", &["palette"]),
            ("forest", &["ref"]),
        ]);

        let query = MemoQuery {
            text: Some("CASTLE".to_string()),
            tag: Some("ref".to_string()),
            newest_first: false,
        };
        let items = store.query(&query);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content(), "castle sketch");
    }

    #[test]
    fn query_can_list_newest_first() {
        let store = store_with(&[("one", &[]), ("two", &[]), ("three", &[])]);
        let query = MemoQuery {
            newest_first: true,
            ..MemoQuery::default()
        };
        let contents: Vec<&str> = store.query(&query).iter().map(|memo| memo.content()).collect();
        assert_eq!(contents, vec!["three", "two", "one"]);
    }
}
