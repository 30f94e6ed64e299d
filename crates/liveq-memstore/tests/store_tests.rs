//! End-to-end tests: observers over the in-memory store
//!
//! Exercises the full path from mutations through live subscriptions to
//! observed state, including query switches and count resolution.

use liveq_memstore::{MemStore, PathQuery};
use liveq_observe::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn seeded(collection: &str, ids: &[&str]) -> MemStore {
    let store = MemStore::new();
    for id in ids {
        store.insert(collection, Record::new(*id, json!({ "name": *id })));
    }
    store
}

fn ids(state: &ObservationState<Vec<Record>>) -> Vec<String> {
    state
        .data
        .as_ref()
        .map(|data| data.iter().map(|r| r.id.to_string()).collect())
        .unwrap_or_default()
}

#[test]
fn collection_observer_tracks_mutations() {
    let store = seeded("items", &["a", "b"]);
    let mut observer = CollectionObserver::new(Arc::new(store.clone()));

    // The initial snapshot arrives synchronously on subscribe.
    let state = observer.observe(Some(Arc::new(PathQuery::collection("items"))));
    assert_eq!(ids(&state), vec!["a", "b"]);
    assert!(!state.loading);

    store.insert("items", Record::new("c", json!({ "name": "c" })));
    assert_eq!(ids(&observer.state()), vec!["a", "b", "c"]);

    store.remove("items", &RecordId::new("a"));
    assert_eq!(ids(&observer.state()), vec!["b", "c"]);
}

#[test]
fn switching_collections_resubscribes_once() {
    let store = seeded("open", &["a"]);
    store.insert("closed", Record::new("z", json!({})));
    let mut observer = CollectionObserver::new(Arc::new(store.clone()));

    let open = Arc::new(PathQuery::collection("open"));
    observer.observe(Some(Arc::clone(&open)));
    // Structurally equal rebuild: no new subscription.
    observer.observe(Some(Arc::new(PathQuery::collection("open"))));
    assert_eq!(store.subscription_count("open"), 1);

    observer.observe(Some(Arc::new(PathQuery::collection("closed"))));
    assert_eq!(store.subscription_count("open"), 0);
    assert_eq!(store.subscription_count("closed"), 1);
    assert_eq!(ids(&observer.state()), vec!["z"]);
}

#[test]
fn teardown_releases_the_subscription() {
    let store = seeded("items", &["a"]);
    let mut observer = CollectionObserver::new(Arc::new(store.clone()));

    observer.observe(Some(Arc::new(PathQuery::collection("items"))));
    assert_eq!(store.subscription_count("items"), 1);

    let state = observer.observe(None);
    assert_eq!(store.subscription_count("items"), 0);
    assert_eq!(state.data, None);
    assert!(!state.loading);
}

#[test]
fn dropping_the_observer_cancels_the_subscription() {
    let store = seeded("items", &["a"]);
    {
        let mut observer = CollectionObserver::new(Arc::new(store.clone()));
        observer.observe(Some(Arc::new(PathQuery::collection("items"))));
        assert_eq!(store.subscription_count("items"), 1);
    }
    assert_eq!(store.subscription_count("items"), 0);
}

#[test]
fn document_observer_follows_a_single_record() {
    let store = seeded("items", &["a1"]);
    let mut observer = DocumentObserver::new(Arc::new(store.clone()));

    let state = observer.observe(Some(Arc::new(PathQuery::document("items", "a1"))));
    assert_eq!(state.data.as_ref().map(|r| r.id.as_str()), Some("a1"));

    store.update("items", &RecordId::new("a1"), json!({ "name": "renamed" }));
    assert_eq!(
        observer.state().data.unwrap().field("name"),
        Some(&json!("renamed"))
    );

    // Deleting the record surfaces as an absent snapshot, not an error.
    store.remove("items", &RecordId::new("a1"));
    let state = observer.state();
    assert_eq!(state.data, None);
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[test]
fn collection_failure_surfaces_in_state_and_keeps_data() {
    let store = seeded("items", &["a"]);
    let mut observer = CollectionObserver::new(Arc::new(store.clone()));

    observer.observe(Some(Arc::new(PathQuery::collection("items"))));
    store.fail_collection("items", SourceError::PermissionDenied("rules".to_string()));

    let state = observer.state();
    assert_eq!(
        state.error,
        Some(SourceError::PermissionDenied("rules".to_string()))
    );
    assert_eq!(ids(&state), vec!["a"]);
    assert!(!state.loading);
}

#[tokio::test]
async fn count_observer_resolves_against_the_store() {
    let store = seeded("items", &["a", "b", "c"]);
    let mut counter = CountObserver::new(Arc::new(store.clone()));

    let mut rx = counter.watch();
    counter.observe(Some(Arc::new(PathQuery::collection("items"))));
    assert!(counter.state().loading);

    while rx.borrow_and_update().count.is_none() {
        rx.changed().await.unwrap();
    }
    let state = counter.state();
    assert_eq!(state.count, Some(3));
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn count_observer_switches_queries() {
    let store = seeded("items", &["a", "b", "c"]);
    let mut counter = CountObserver::new(Arc::new(store.clone()));

    let mut rx = counter.watch();
    counter.observe(Some(Arc::new(PathQuery::collection("items"))));
    while rx.borrow_and_update().count.is_none() {
        rx.changed().await.unwrap();
    }

    counter.observe(Some(Arc::new(PathQuery::collection("items").with_limit(2))));
    while rx.borrow_and_update().count != Some(2) {
        rx.changed().await.unwrap();
    }
    assert!(!counter.state().loading);
}

#[tokio::test]
async fn count_observer_reports_backend_failure() {
    let store = MemStore::new();
    store.fail_collection("items", SourceError::Unavailable("down".to_string()));
    let mut counter = CountObserver::new(Arc::new(store.clone()));

    let mut rx = counter.watch();
    counter.observe(Some(Arc::new(PathQuery::collection("items"))));
    while rx.borrow_and_update().error.is_none() {
        rx.changed().await.unwrap();
    }

    let state = counter.state();
    assert_eq!(state.error, Some(SourceError::Unavailable("down".to_string())));
    assert_eq!(state.count, None);
    assert!(!state.loading);
}
