//! In-memory live document store
//!
//! [`MemStore`] implements the backend boundary consumed by the observers:
//! change-stream subscriptions per collection (or single record) and
//! one-shot aggregate counts resolved on spawned tasks. Every mutation
//! pushes a fresh, complete snapshot to all open subscriptions of the
//! touched collection - snapshots are authoritative, never incremental.
//!
//! Rows keep insertion order, which is the delivery order subscribers
//! see. A collection can be marked failed to drive error-path behavior
//! in consumers.

use crate::query::PathQuery;
use dashmap::DashMap;
use indexmap::IndexMap;
use liveq_core::{CancelGuard, CountReply, LiveSource, Record, RecordId, SourceError, Subscriber};
use std::sync::Arc;
use ulid::Ulid;

struct LiveCollectionSub {
    id: Ulid,
    query: Arc<PathQuery>,
    subscriber: Subscriber<Vec<Record>>,
}

struct LiveDocumentSub {
    id: Ulid,
    target: RecordId,
    subscriber: Subscriber<Option<Record>>,
}

#[derive(Default)]
struct Shard {
    rows: IndexMap<RecordId, serde_json::Value>,
    live: Vec<LiveCollectionSub>,
    docs: Vec<LiveDocumentSub>,
    failure: Option<SourceError>,
}

impl Shard {
    fn snapshot(&self, query: &PathQuery) -> Vec<Record> {
        let take = query.limit().unwrap_or(usize::MAX);
        self.rows
            .iter()
            .take(take)
            .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
            .collect()
    }

    fn record(&self, id: &RecordId) -> Option<Record> {
        self.rows
            .get(id)
            .map(|fields| Record::new(id.clone(), fields.clone()))
    }

    fn notify(&self) {
        for sub in &self.live {
            sub.subscriber.deliver(self.snapshot(&sub.query));
        }
        for doc in &self.docs {
            doc.subscriber.deliver(self.record(&doc.target));
        }
    }
}

#[derive(Default)]
struct Inner {
    collections: DashMap<String, Shard>,
}

/// In-memory document store with live change-stream subscriptions
#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<Inner>,
}

impl MemStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a record and push snapshots to subscribers
    pub fn insert(&self, collection: &str, record: Record) {
        let mut shard = self
            .inner
            .collections
            .entry(collection.to_string())
            .or_default();
        shard.rows.insert(record.id, record.fields);
        shard.notify();
    }

    /// Replace the fields of an existing record.
    ///
    /// Returns `false` (and pushes nothing) when the record is absent.
    pub fn update(&self, collection: &str, id: &RecordId, fields: serde_json::Value) -> bool {
        let Some(mut shard) = self.inner.collections.get_mut(collection) else {
            return false;
        };
        let Some(slot) = shard.rows.get_mut(id) else {
            return false;
        };
        *slot = fields;
        shard.notify();
        true
    }

    /// Remove a record, preserving the order of the remaining rows.
    ///
    /// Returns `false` when the record was absent.
    pub fn remove(&self, collection: &str, id: &RecordId) -> bool {
        let Some(mut shard) = self.inner.collections.get_mut(collection) else {
            return false;
        };
        if shard.rows.shift_remove(id).is_none() {
            return false;
        }
        shard.notify();
        true
    }

    /// Mark a collection failed: open subscriptions receive the error and
    /// later subscriptions and counts fail immediately
    pub fn fail_collection(&self, collection: &str, error: SourceError) {
        let mut shard = self
            .inner
            .collections
            .entry(collection.to_string())
            .or_default();
        tracing::debug!(collection, %error, "marking collection as failed");
        shard.failure = Some(error.clone());
        for sub in &shard.live {
            sub.subscriber.fail(error.clone());
        }
        for doc in &shard.docs {
            doc.subscriber.fail(error.clone());
        }
    }

    /// Number of records in a collection
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .collections
            .get(collection)
            .map_or(0, |shard| shard.rows.len())
    }

    /// Whether a collection has no records
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Open subscriptions (collection and document) for a collection
    #[must_use]
    pub fn subscription_count(&self, collection: &str) -> usize {
        self.inner
            .collections
            .get(collection)
            .map_or(0, |shard| shard.live.len() + shard.docs.len())
    }
}

impl LiveSource<PathQuery> for MemStore {
    fn subscribe_collection(
        &self,
        query: Arc<PathQuery>,
        subscriber: Subscriber<Vec<Record>>,
    ) -> CancelGuard {
        let path = query.path().to_string();
        let mut shard = self.inner.collections.entry(path.clone()).or_default();
        if let Some(error) = &shard.failure {
            subscriber.fail(error.clone());
            return CancelGuard::noop();
        }

        let id = Ulid::new();
        // First snapshot is delivered on open.
        subscriber.deliver(shard.snapshot(&query));
        shard.live.push(LiveCollectionSub {
            id,
            query,
            subscriber,
        });
        drop(shard);

        let inner = Arc::clone(&self.inner);
        CancelGuard::new(move || {
            if let Some(mut shard) = inner.collections.get_mut(&path) {
                shard.live.retain(|sub| sub.id != id);
            }
        })
    }

    fn subscribe_document(
        &self,
        query: Arc<PathQuery>,
        subscriber: Subscriber<Option<Record>>,
    ) -> CancelGuard {
        let Some(target) = query.doc_id().cloned() else {
            subscriber.fail(SourceError::backend(
                "document subscription requires a record reference",
            ));
            return CancelGuard::noop();
        };

        let path = query.path().to_string();
        let mut shard = self.inner.collections.entry(path.clone()).or_default();
        if let Some(error) = &shard.failure {
            subscriber.fail(error.clone());
            return CancelGuard::noop();
        }

        let id = Ulid::new();
        subscriber.deliver(shard.record(&target));
        shard.docs.push(LiveDocumentSub {
            id,
            target,
            subscriber,
        });
        drop(shard);

        let inner = Arc::clone(&self.inner);
        CancelGuard::new(move || {
            if let Some(mut shard) = inner.collections.get_mut(&path) {
                shard.docs.retain(|sub| sub.id != id);
            }
        })
    }

    fn count(&self, query: Arc<PathQuery>, reply: CountReply) -> CancelGuard {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            // Resolve off the caller's stack, like a real backend would.
            tokio::task::yield_now().await;
            let result = match inner.collections.get(query.path()) {
                Some(shard) => match &shard.failure {
                    Some(error) => Err(error.clone()),
                    None => {
                        let n = query.limit().map_or(shard.rows.len(), |limit| {
                            shard.rows.len().min(limit)
                        });
                        Ok(u64::try_from(n).unwrap_or(u64::MAX))
                    }
                },
                None => Ok(0),
            };
            reply.resolve(result);
        });
        CancelGuard::new(move || handle.abort())
    }
}

impl std::fmt::Debug for MemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemStore")
            .field("collections", &self.inner.collections.len())
            .finish()
    }
}
