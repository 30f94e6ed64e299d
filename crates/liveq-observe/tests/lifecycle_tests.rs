//! Observer lifecycle tests
//!
//! End-to-end behavior of the observers against a scripted backend:
//! identity stability, cancel-then-open cycles, stale-result discard,
//! and teardown.

use liveq_observe::prelude::*;
use liveq_observe::ComparisonError;
use liveq_test_utils::{init_tracing, record, records, ItemQuery, ScriptedSource};
use serde_json::json;
use std::sync::Arc;

fn ids(state: &ObservationState<Vec<Record>>) -> Vec<String> {
    state
        .data
        .as_ref()
        .map(|data| data.iter().map(|r| r.id.to_string()).collect())
        .unwrap_or_default()
}

#[test]
fn switching_filters_keeps_previous_data_until_new_snapshot() {
    init_tracing();
    let source: ScriptedSource<ItemQuery> = ScriptedSource::new();
    let mut observer = CollectionObserver::new(Arc::new(source.clone()));

    // Observe "open items" and receive a 3-record snapshot.
    observer.observe(Some(ItemQuery::filtered("items", "open")));
    source.deliver_collection(0, records(&["a", "b", "c"]));

    let state = observer.state();
    assert_eq!(ids(&state), vec!["a", "b", "c"]);
    assert!(!state.loading);
    assert_eq!(state.error, None);

    // Switch to "closed items" before any further snapshot: loading turns
    // on while the previous records stay visible.
    let state = observer.observe(Some(ItemQuery::filtered("items", "closed")));
    assert!(state.loading);
    assert_eq!(ids(&state), vec!["a", "b", "c"]);
    assert_eq!(state.error, None);

    // The new query's first snapshot replaces the data wholesale.
    source.deliver_collection(1, records(&["d"]));
    let state = observer.state();
    assert_eq!(ids(&state), vec!["d"]);
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[test]
fn rapid_query_changes_only_apply_latest_generation() {
    init_tracing();
    let source: ScriptedSource<ItemQuery> = ScriptedSource::new();
    let mut observer = CollectionObserver::new(Arc::new(source.clone()));

    observer.observe(Some(ItemQuery::filtered("items", "one")));
    observer.observe(Some(ItemQuery::filtered("items", "two")));
    observer.observe(Some(ItemQuery::filtered("items", "three")));

    assert_eq!(source.collection_subscriptions(), 3);
    assert!(source.collection_cancelled(0));
    assert!(source.collection_cancelled(1));
    assert!(!source.collection_cancelled(2));

    // Results arrive out of order; only the latest generation lands.
    source.deliver_collection(1, records(&["two"]));
    source.deliver_collection(0, records(&["one"]));
    assert_eq!(observer.state().data, None);

    source.deliver_collection(2, records(&["three"]));
    assert_eq!(ids(&observer.state()), vec!["three"]);
}

#[test]
fn teardown_then_new_query_starts_clean() {
    let source: ScriptedSource<ItemQuery> = ScriptedSource::new();
    let mut observer = CollectionObserver::new(Arc::new(source.clone()));

    observer.observe(Some(ItemQuery::new("items")));
    source.deliver_collection(0, records(&["a"]));
    observer.observe(None);

    let state = observer.state();
    assert_eq!(state.data, None);
    assert!(!state.loading);

    // Same structural query after teardown opens a fresh subscription;
    // the stabilizer does not match against cleared state.
    observer.observe(Some(ItemQuery::new("items")));
    assert_eq!(source.collection_subscriptions(), 2);
    assert!(observer.state().loading);
}

#[test]
fn independent_observers_do_not_share_subscriptions() {
    let source: ScriptedSource<ItemQuery> = ScriptedSource::new();
    let mut first = CollectionObserver::new(Arc::new(source.clone()));
    let mut second = CollectionObserver::new(Arc::new(source.clone()));

    // Structurally equal queries from independent consumers each get
    // their own subscription - no cross-consumer deduplication.
    first.observe(Some(ItemQuery::filtered("items", "open")));
    second.observe(Some(ItemQuery::filtered("items", "open")));
    assert_eq!(source.collection_subscriptions(), 2);

    source.deliver_collection(0, records(&["a"]));
    assert_eq!(ids(&first.state()), vec!["a"]);
    assert_eq!(second.state().data, None);
}

#[test]
fn document_and_count_follow_the_same_lifecycle() {
    let source: ScriptedSource<ItemQuery> = ScriptedSource::new();
    let mut doc = DocumentObserver::new(Arc::new(source.clone()));
    let mut count = CountObserver::new(Arc::new(source.clone()));

    doc.observe(Some(ItemQuery::new("items/a1")));
    count.observe(Some(ItemQuery::filtered("items", "open")));

    source.deliver_document(0, Some(record("a1", json!({ "status": "open" }))));
    source.resolve_count(0, Ok(3));

    assert_eq!(doc.state().data.unwrap().field("status"), Some(&json!("open")));
    assert_eq!(count.state().count, Some(3));

    // Null query tears both down.
    doc.observe(None);
    count.observe(None);
    assert!(source.document_cancelled(0));
    assert_eq!(doc.state().data, None);
    assert_eq!(count.state(), CountState::idle());
}

#[test]
fn comparator_strategy_is_pluggable() {
    let source: ScriptedSource<ItemQuery> = ScriptedSource::new();
    // Compare by path only: filter changes do not resubscribe.
    let mut observer = CollectionObserver::with_comparator(
        Arc::new(source.clone()),
        |a: &ItemQuery, b: &ItemQuery| -> Result<bool, ComparisonError> { Ok(a.path == b.path) },
    );

    observer.observe(Some(ItemQuery::filtered("items", "open")));
    observer.observe(Some(ItemQuery::filtered("items", "closed")));
    assert_eq!(source.collection_subscriptions(), 1);

    observer.observe(Some(ItemQuery::filtered("archive", "open")));
    assert_eq!(source.collection_subscriptions(), 2);
}
