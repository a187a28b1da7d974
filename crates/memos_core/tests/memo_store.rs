use memos_core::{
    AnnotationDocument, Clock, InMemoryDocument, LoadOutcome, ManualClock, Memo, MemoStore,
    SaveOutcome, StoreError, ANNOTATION_DESCRIPTION, ANNOTATION_KEY,
};
use serde_json::{json, Value};
use std::rc::Rc;
use uuid::Uuid;

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn bound_store(doc: &Rc<InMemoryDocument>) -> MemoStore {
    let mut store = MemoStore::new();
    store.bind(doc);
    store
}

fn stored_payload(doc: &InMemoryDocument) -> Value {
    serde_json::from_slice(&doc.annotation(ANNOTATION_KEY).unwrap()).unwrap()
}

#[test]
fn add_then_reload_from_copied_bytes_restores_memo() {
    let doc = Rc::new(InMemoryDocument::new("painting.kra"));
    let mut store = bound_store(&doc);
    let memo = Memo::new("fix the hands", tags(&["anatomy", "todo"]));
    let uid = memo.uid();

    assert_eq!(store.add(memo), SaveOutcome::Saved);

    let bytes = doc.annotation(ANNOTATION_KEY).unwrap();
    let reopened =
        Rc::new(InMemoryDocument::new("painting.kra").with_annotation(ANNOTATION_KEY, bytes));
    let mut fresh = MemoStore::new();
    assert_eq!(
        fresh.bind(&reopened),
        LoadOutcome::Loaded {
            loaded: 1,
            skipped: 0
        }
    );

    let loaded = fresh.get(uid).unwrap();
    assert_eq!(loaded.content(), "fix the hands");
    assert_eq!(loaded.hashtags(), tags(&["anatomy", "todo"]).as_slice());
    assert_eq!(loaded, store.get(uid).unwrap());
}

#[test]
fn save_writes_versioned_envelope_under_well_known_key() {
    let doc = Rc::new(InMemoryDocument::new("a.kra"));
    let mut store = bound_store(&doc);
    store.add(Memo::new("one", Vec::new()));
    store.add(Memo::new("two", tags(&["x"])));

    let payload = stored_payload(&doc);
    assert_eq!(payload["version"], 1);
    assert_eq!(payload["memos"].as_array().unwrap().len(), 2);
    assert_eq!(payload["memos"][0]["content"], "one");
    assert_eq!(payload["memos"][1]["hashtags"], json!(["x"]));
    assert_eq!(
        doc.annotation_description(ANNOTATION_KEY).as_deref(),
        Some(ANNOTATION_DESCRIPTION)
    );
}

#[test]
fn missing_key_loads_empty() {
    let doc = Rc::new(InMemoryDocument::new("blank.kra"));
    let mut store = MemoStore::new();
    assert_eq!(store.bind(&doc), LoadOutcome::Missing);
    assert!(store.is_empty());
    assert!(store.is_bound());
}

#[test]
fn corrupt_payload_loads_empty_without_error() {
    let doc = Rc::new(
        InMemoryDocument::new("broken.kra").with_annotation(ANNOTATION_KEY, "{\"memos\": [oops"),
    );
    let mut store = MemoStore::new();
    assert_eq!(store.bind(&doc), LoadOutcome::Corrupt);
    assert!(store.is_empty());

    // The store stays usable and overwrites the corrupt blob on the next save.
    store.add(Memo::new("recovered", Vec::new()));
    assert_eq!(stored_payload(&doc)["memos"][0]["content"], "recovered");
}

#[test]
fn malformed_records_are_skipped_individually() {
    let payload = json!({
        "version": 1,
        "memos": [
            { "content": "good one", "hashtags": ["a"] },
            { "hashtags": ["no content"] },
            "not even an object",
            { "content": "good two" }
        ]
    });
    let doc = Rc::new(
        InMemoryDocument::new("mixed.kra").with_annotation(ANNOTATION_KEY, payload.to_string()),
    );
    let mut store = MemoStore::new();

    assert_eq!(
        store.bind(&doc),
        LoadOutcome::Loaded {
            loaded: 2,
            skipped: 2
        }
    );
    let contents: Vec<&str> = store.memos().iter().map(Memo::content).collect();
    assert_eq!(contents, vec!["good one", "good two"]);
}

#[test]
fn unknown_version_is_read_best_effort() {
    let payload = json!({
        "version": 7,
        "extra": { "future": true },
        "memos": [{ "content": "from the future", "pinned": true }]
    });
    let doc = Rc::new(
        InMemoryDocument::new("future.kra").with_annotation(ANNOTATION_KEY, payload.to_string()),
    );
    let store = bound_store(&doc);

    assert_eq!(store.len(), 1);
    assert_eq!(store.memos()[0].content(), "from the future");
}

#[test]
fn unbound_mutations_change_memory_but_skip_save() {
    let mut store = MemoStore::new();
    let memo = Memo::new("offline", Vec::new());
    let uid = memo.uid();

    assert_eq!(store.add(memo), SaveOutcome::Unbound);
    assert_eq!(store.len(), 1);
    assert_eq!(store.update(uid, "still offline", Vec::new()), Ok(SaveOutcome::Unbound));
    assert_eq!(store.save(), SaveOutcome::Unbound);
    assert_eq!(store.load(), LoadOutcome::Unbound);
    assert!(store.is_empty());
}

#[test]
fn dropped_document_counts_as_unbound() {
    let doc = Rc::new(InMemoryDocument::new("closed.kra"));
    let mut store = bound_store(&doc);
    drop(doc);

    assert!(!store.is_bound());
    assert_eq!(store.add(Memo::new("orphan", Vec::new())), SaveOutcome::Unbound);
}

#[test]
fn binding_keeps_only_a_weak_handle() {
    let mut store = MemoStore::new();
    store.bind(&Rc::new(InMemoryDocument::new("temp.kra")));
    assert!(!store.is_bound());
    assert_eq!(store.add(Memo::new("lost", Vec::new())), SaveOutcome::Unbound);

    let doc = Rc::new(InMemoryDocument::new("kept.kra"));
    store.bind(&doc);
    assert!(store.is_bound());
    assert_eq!(store.add(Memo::new("kept", Vec::new())), SaveOutcome::Saved);
    assert_eq!(doc.write_count(), 1);
}

#[test]
fn failed_write_keeps_memory_and_next_save_heals() {
    let doc = Rc::new(InMemoryDocument::new("locked.kra"));
    let mut store = bound_store(&doc);
    store.add(Memo::new("first", Vec::new()));

    doc.set_fail_writes(true);
    assert_eq!(store.add(Memo::new("second", Vec::new())), SaveOutcome::Failed);
    assert_eq!(store.len(), 2);
    assert_eq!(stored_payload(&doc)["memos"].as_array().unwrap().len(), 1);

    doc.set_fail_writes(false);
    assert_eq!(store.add(Memo::new("third", Vec::new())), SaveOutcome::Saved);
    assert_eq!(stored_payload(&doc)["memos"].as_array().unwrap().len(), 3);
}

#[test]
fn update_replaces_fields_and_bumps_modified() {
    let clock = Rc::new(ManualClock::at_epoch());
    let doc = Rc::new(InMemoryDocument::new("u.kra"));
    let mut store = MemoStore::with_clock(clock.clone());
    store.bind(&doc);

    let memo = Memo::new_at("draft", tags(&["a"]), clock.now());
    let uid = memo.uid();
    store.add(memo);

    clock.advance_ms(1_000);
    assert_eq!(store.update(uid, "final", tags(&["b", "a"])), Ok(SaveOutcome::Saved));

    let updated = store.get(uid).unwrap();
    assert_eq!(updated.content(), "final");
    assert_eq!(updated.hashtags(), tags(&["b", "a"]).as_slice());
    assert_eq!((updated.modified() - updated.created()).num_milliseconds(), 1_000);
}

#[test]
fn update_missing_memo_reports_not_found_and_does_not_save() {
    let doc = Rc::new(InMemoryDocument::new("n.kra"));
    let mut store = bound_store(&doc);
    store.add(Memo::new("present", Vec::new()));
    let writes = doc.write_count();

    let ghost = Uuid::new_v4();
    assert_eq!(
        store.update(ghost, "nobody", Vec::new()),
        Err(StoreError::NotFound(ghost))
    );
    assert_eq!(doc.write_count(), writes);
}

#[test]
fn delete_removes_memo_and_absent_uid_is_noop() {
    let doc = Rc::new(InMemoryDocument::new("d.kra"));
    let mut store = bound_store(&doc);
    let keep = Memo::new("keep", Vec::new());
    let gone = Memo::new("gone", Vec::new());
    let gone_uid = gone.uid();
    store.add(keep);
    store.add(gone);

    let removed = store.delete(gone_uid).unwrap();
    assert_eq!(removed.content(), "gone");
    assert!(store.get(gone_uid).is_none());
    assert_eq!(stored_payload(&doc)["memos"].as_array().unwrap().len(), 1);

    assert!(store.delete(Uuid::new_v4()).is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn restore_appends_at_end() {
    let mut store = MemoStore::new();
    let first = Memo::new("first", Vec::new());
    let first_uid = first.uid();
    store.add(first);
    store.add(Memo::new("second", Vec::new()));

    let removed = store.delete(first_uid).unwrap();
    store.restore(removed);

    let contents: Vec<&str> = store.memos().iter().map(Memo::content).collect();
    assert_eq!(contents, vec!["second", "first"]);
}

#[test]
fn search_keeps_creation_order_and_empty_query_returns_all() {
    let mut store = MemoStore::new();
    store.add(Memo::new("Castle at dusk", Vec::new()));
    store.add(Memo::new("forest", tags(&["castle-ref"])));
    store.add(Memo::new("river", Vec::new()));

    let all: Vec<&str> = store.search("").iter().map(|memo| memo.content()).collect();
    assert_eq!(all, vec!["Castle at dusk", "forest", "river"]);

    let hits: Vec<&str> = store.search("CASTLE").iter().map(|memo| memo.content()).collect();
    assert_eq!(hits, vec!["Castle at dusk", "forest"]);

    for memo in store.memos() {
        let listed = store.search("cast").iter().any(|hit| hit.uid() == memo.uid());
        assert_eq!(listed, memo.matches("cast"));
    }
}

#[test]
fn filter_by_tag_is_exact_and_case_sensitive() {
    let mut store = MemoStore::new();
    store.add(Memo::new("one", tags(&["Ref"])));
    store.add(Memo::new("two", tags(&["ref"])));
    store.add(Memo::new("three", tags(&["reference"])));

    let hits: Vec<&str> = store.filter_by_tag("ref").iter().map(|memo| memo.content()).collect();
    assert_eq!(hits, vec!["two"]);
    assert_eq!(store.filter_by_tag("").len(), 3);
}

#[test]
fn list_tags_is_sorted_and_deduplicated() {
    let mut store = MemoStore::new();
    store.add(Memo::new("x", tags(&["b", "a"])));
    store.add(Memo::new("y", tags(&["a", "c"])));

    assert_eq!(store.list_tags(), tags(&["a", "b", "c"]));
}

#[test]
fn rebinding_discards_previous_document_memos() {
    let first = Rc::new(InMemoryDocument::new("first.kra"));
    let second = Rc::new(InMemoryDocument::new("second.kra"));
    let mut store = bound_store(&first);
    store.add(Memo::new("belongs to first", Vec::new()));

    assert_eq!(store.bind(&second), LoadOutcome::Missing);
    assert!(store.is_empty());
    assert!(store.is_bound_to(&second.identity()));

    store.add(Memo::new("belongs to second", Vec::new()));
    assert_eq!(stored_payload(&first)["memos"][0]["content"], "belongs to first");
    assert_eq!(stored_payload(&second)["memos"][0]["content"], "belongs to second");
}

#[test]
fn unbind_clears_collection() {
    let doc = Rc::new(InMemoryDocument::new("x.kra"));
    let mut store = bound_store(&doc);
    store.add(Memo::new("note", Vec::new()));

    store.unbind();
    assert!(store.is_empty());
    assert!(store.bound_identity().is_none());
}
