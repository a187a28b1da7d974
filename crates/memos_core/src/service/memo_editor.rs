//! Edit session and autosave controller.
//!
//! # Responsibility
//! - Turn in-progress edits into `MemoStore::add`/`update` calls.
//! - Debounce rapid edits into one commit per pause.
//! - Keep the session-scoped stack of deleted memos for undo.
//!
//! # Invariants
//! - The first non-empty content of a new memo is committed immediately.
//! - An emptied memo is never persisted as empty and never auto-deleted.
//! - Any document change stops the pending timer before rebinding, so a
//!   stale commit can never land in another document.
//! - Navigation discards a pending edit unless `flush_on_navigate` is set.

use crate::clock::Clock;
use crate::config::EditorConfig;
use crate::document::AnnotationDocument;
use crate::logging::MessageDeduper;
use crate::model::memo::{Memo, MemoId};
use crate::service::autosave::DebounceTimer;
use crate::store::memo_store::{LoadOutcome, MemoStore, StoreError};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::rc::Rc;

/// Which memo, if any, the session is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    /// No memo open.
    Idle,
    /// Composing a memo that is not stored yet.
    Creating,
    /// Editing the stored memo with this id.
    Editing(MemoId),
}

/// Result of one debounce timer fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveOutcome {
    /// Buffers differ from the baseline and were written.
    Updated(MemoId),
    /// Buffers equal the baseline; nothing written.
    Unchanged,
    /// Content is empty; nothing written, stored memo left as is.
    SkippedEmpty,
    /// The edited memo no longer exists in the store.
    NotFound(MemoId),
    /// No stored memo is open (idle, or composing with empty content).
    NoTarget,
}

/// Normalizes one raw tag input.
///
/// Strips surrounding whitespace and every leading `#`; returns `None` when
/// nothing is left. Case is preserved.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches('#').trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

/// Autosaving memo editor bound to one `MemoStore`.
pub struct MemoEditor {
    store: MemoStore,
    config: EditorConfig,
    clock: Rc<dyn Clock>,
    state: EditState,
    content: String,
    tags: Vec<String>,
    saved_content: String,
    saved_tags: Vec<String>,
    dirty: bool,
    timer: DebounceTimer,
    deleted: Vec<Memo>,
    diagnostics: MessageDeduper,
}

impl MemoEditor {
    /// Creates an idle editor over an unbound store.
    pub fn new(config: EditorConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            store: MemoStore::with_clock(clock.clone()),
            config,
            timer: DebounceTimer::new(config.autosave_delay_ms),
            diagnostics: MessageDeduper::new(config.log_dedupe_window_ms, clock.clone()),
            clock,
            state: EditState::Idle,
            content: String::new(),
            tags: Vec::new(),
            saved_content: String::new(),
            saved_tags: Vec::new(),
            dirty: false,
            deleted: Vec::new(),
        }
    }

    /// Read access for list/search views.
    pub fn store(&self) -> &MemoStore {
        &self.store
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// Current content buffer, untrimmed.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Current tag buffer.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Deadline of the pending autosave, for the host to arm a real timer.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timer.deadline()
    }

    /// Makes `document` the active one.
    ///
    /// A different document resets the session, clears the undo stack and
    /// reloads; the same document is left untouched. The store holds the
    /// document weakly, so the caller keeps the `Rc` alive while editing.
    pub fn set_document<D: AnnotationDocument + 'static>(
        &mut self,
        document: &Rc<D>,
    ) -> Option<LoadOutcome> {
        let id = document.identity();
        if self.store.is_bound() && self.store.is_bound_to(&id) {
            debug!("event=editor_document module=editor status=unchanged document={id}");
            return None;
        }

        self.leave_current();
        self.deleted.clear();
        self.diagnostics.reset();
        Some(self.store.bind(document))
    }

    /// Resets the session and unbinds the store.
    pub fn close_document(&mut self) {
        self.leave_current();
        self.deleted.clear();
        self.diagnostics.reset();
        self.store.unbind();
    }

    /// Starts composing a new memo.
    pub fn new_memo(&mut self) {
        self.leave_current();
        self.state = EditState::Creating;
    }

    /// Opens a stored memo for editing.
    ///
    /// Returns `false` and keeps the current session when `uid` is unknown.
    pub fn open_memo(&mut self, uid: MemoId) -> bool {
        if self.store.get(uid).is_none() {
            warn!("event=editor_open module=editor status=not_found uid={uid}");
            return false;
        }

        self.leave_current();
        if let Some(memo) = self.store.get(uid) {
            self.content = memo.content().to_string();
            self.tags = memo.hashtags().to_vec();
            self.saved_content = self.content.clone();
            self.saved_tags = self.tags.clone();
        }
        self.state = EditState::Editing(uid);
        true
    }

    /// Closes the open memo.
    pub fn close(&mut self) {
        self.leave_current();
    }

    /// Replaces the content buffer.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.on_changed("content");
    }

    /// Replaces the tag buffer as-is.
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = tags;
        self.on_changed("tags");
    }

    /// Replaces content and tags as a single change notification.
    pub fn apply_edit(&mut self, content: impl Into<String>, tags: Vec<String>) {
        self.content = content.into();
        self.tags = tags;
        self.on_changed("edit");
    }

    /// Adds one tag from raw input.
    ///
    /// Returns `false` when the input normalizes to nothing or the tag is
    /// already present.
    pub fn add_tag(&mut self, raw: &str) -> bool {
        let Some(tag) = normalize_tag(raw) else {
            return false;
        };
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        self.on_changed("tags");
        true
    }

    /// Removes one tag; returns `false` when it is not present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let Some(index) = self.tags.iter().position(|value| value == tag) else {
            return false;
        };
        self.tags.remove(index);
        self.on_changed("tags");
        true
    }

    /// Runs the autosave commit when its deadline has passed.
    pub fn poll(&mut self) -> Option<AutosaveOutcome> {
        if self.timer.fire_if_due(self.clock.now()) {
            Some(self.commit())
        } else {
            None
        }
    }

    /// Commits a pending edit right away. Returns `None` when nothing is
    /// pending.
    pub fn flush(&mut self) -> Option<AutosaveOutcome> {
        if !self.timer.is_pending() {
            return None;
        }
        self.timer.cancel();
        Some(self.commit())
    }

    /// Removes a memo and remembers it for undo.
    ///
    /// Returns `false` when `uid` is unknown.
    pub fn delete_memo(&mut self, uid: MemoId) -> bool {
        if self.state == EditState::Editing(uid) {
            self.timer.cancel();
            self.reset_session();
        }

        match self.store.delete(uid) {
            Some(memo) => {
                info!(
                    "event=memo_deleted module=editor uid={uid} undo_depth={}",
                    self.deleted.len() + 1
                );
                self.deleted.push(memo);
                true
            }
            None => false,
        }
    }

    /// Re-inserts the most recently deleted memo at the end of the store.
    ///
    /// Timestamps are kept exactly as they were before deletion.
    pub fn undo_delete(&mut self) -> Option<MemoId> {
        let memo = self.deleted.pop()?;
        let uid = memo.uid();
        self.store.restore(memo);
        info!(
            "event=memo_restored module=editor uid={uid} undo_depth={}",
            self.deleted.len()
        );
        Some(uid)
    }

    pub fn can_undo(&self) -> bool {
        !self.deleted.is_empty()
    }

    fn on_changed(&mut self, source: &'static str) {
        self.dirty = true;
        self.timer.cancel();
        self.trace(source);

        if self.state == EditState::Creating && !self.content.trim().is_empty() {
            self.create_now();
            return;
        }
        self.timer.restart(self.clock.now());
    }

    fn create_now(&mut self) {
        let content = self.content.trim().to_string();
        let memo = Memo::new_at(content.clone(), self.tags.clone(), self.clock.now());
        let uid = memo.uid();
        let outcome = self.store.add(memo);
        info!("event=memo_created module=editor uid={uid} save={outcome:?}");

        self.state = EditState::Editing(uid);
        self.saved_content = content;
        self.saved_tags = self.tags.clone();
        self.dirty = false;
    }

    fn commit(&mut self) -> AutosaveOutcome {
        let EditState::Editing(uid) = self.state else {
            return AutosaveOutcome::NoTarget;
        };
        if !self.dirty {
            return AutosaveOutcome::Unchanged;
        }

        let content = self.content.trim().to_string();
        if content == self.saved_content && self.tags == self.saved_tags {
            self.dirty = false;
            return AutosaveOutcome::Unchanged;
        }
        if content.is_empty() {
            self.dirty = false;
            debug!("event=autosave module=editor status=skipped reason=empty uid={uid}");
            return AutosaveOutcome::SkippedEmpty;
        }

        match self.store.update(uid, content.clone(), self.tags.clone()) {
            Ok(outcome) => {
                debug!("event=autosave module=editor status=ok uid={uid} save={outcome:?}");
                self.saved_content = content;
                self.saved_tags = self.tags.clone();
                self.dirty = false;
                AutosaveOutcome::Updated(uid)
            }
            Err(StoreError::NotFound(missing)) => {
                self.dirty = false;
                AutosaveOutcome::NotFound(missing)
            }
        }
    }

    /// Stops the timer, flushing first when configured, then goes idle.
    fn leave_current(&mut self) {
        if self.config.flush_on_navigate {
            if let Some(outcome) = self.flush() {
                debug!("event=autosave module=editor status=flushed outcome={outcome:?}");
            }
        } else if self.timer.is_pending() {
            debug!("event=autosave module=editor status=discarded reason=navigate");
        }
        self.timer.cancel();
        self.reset_session();
    }

    fn reset_session(&mut self) {
        self.state = EditState::Idle;
        self.content.clear();
        self.tags.clear();
        self.saved_content.clear();
        self.saved_tags.clear();
        self.dirty = false;
    }

    fn trace(&mut self, source: &'static str) {
        let message = format!("event=edit_changed module=editor source={source}");
        if self.diagnostics.should_emit(&message) {
            debug!("{message}");
        }
    }
}
