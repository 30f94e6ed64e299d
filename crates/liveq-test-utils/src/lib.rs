//! Testing utilities for the LIVEQ workspace
//!
//! Shared test helpers: a fully scripted backend source, record fixtures,
//! and tracing setup for integration tests.

#![allow(missing_docs)]

use liveq_core::{CancelGuard, CountReply, LiveSource, Record, SourceError, Subscriber};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

/// Initialize tracing output for tests. Safe to call repeatedly.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Build a record fixture from an id and JSON fields.
pub fn record(id: &str, fields: serde_json::Value) -> Record {
    Record::new(id, fields)
}

/// Build a snapshot of records with empty fields, preserving the id order.
pub fn records(ids: &[&str]) -> Vec<Record> {
    ids.iter()
        .map(|id| Record::new(*id, serde_json::json!({})))
        .collect()
}

/// A simple structural query descriptor for tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemQuery {
    pub path: String,
    pub filter: Option<String>,
}

impl ItemQuery {
    pub fn new(path: &str) -> Arc<Self> {
        Arc::new(Self {
            path: path.to_string(),
            filter: None,
        })
    }

    pub fn filtered(path: &str, filter: &str) -> Arc<Self> {
        Arc::new(Self {
            path: path.to_string(),
            filter: Some(filter.to_string()),
        })
    }
}

struct ScriptedSub<Q, T> {
    query: Arc<Q>,
    subscriber: Subscriber<T>,
    cancelled: Arc<AtomicBool>,
}

struct ScriptedCount<Q> {
    query: Arc<Q>,
    reply: Option<CountReply>,
    cancelled: Arc<AtomicBool>,
}

struct Script<Q> {
    collections: Vec<ScriptedSub<Q, Vec<Record>>>,
    documents: Vec<ScriptedSub<Q, Option<Record>>>,
    counts: Vec<ScriptedCount<Q>>,
}

impl<Q> Default for Script<Q> {
    fn default() -> Self {
        Self {
            collections: Vec::new(),
            documents: Vec::new(),
            counts: Vec::new(),
        }
    }
}

/// A backend source driven entirely by the test.
///
/// Records every subscribe/count/cancel call and lets the test deliver
/// snapshots, errors, and count results by hand - including to
/// subscriptions that were already cancelled, which is exactly how the
/// stale-result discard paths get exercised.
pub struct ScriptedSource<Q> {
    inner: Arc<Mutex<Script<Q>>>,
}

impl<Q> Default for ScriptedSource<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q> Clone for ScriptedSource<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Q> ScriptedSource<Q> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Script::default())),
        }
    }

    // ── collection subscriptions ──────────────────────────────────────────

    /// Total collection subscriptions ever opened.
    pub fn collection_subscriptions(&self) -> usize {
        self.inner.lock().collections.len()
    }

    /// Collection subscriptions not yet cancelled.
    pub fn active_collections(&self) -> usize {
        self.inner
            .lock()
            .collections
            .iter()
            .filter(|sub| !sub.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Query of the index-th collection subscription (in open order).
    pub fn collection_query(&self, index: usize) -> Arc<Q> {
        Arc::clone(&self.inner.lock().collections[index].query)
    }

    pub fn collection_cancelled(&self, index: usize) -> bool {
        self.inner.lock().collections[index]
            .cancelled
            .load(Ordering::SeqCst)
    }

    /// Push a snapshot through the index-th collection subscription.
    ///
    /// Works on cancelled subscriptions too: a backend SDK that cannot
    /// cancel immediately will still invoke its callbacks.
    pub fn deliver_collection(&self, index: usize, snapshot: Vec<Record>) {
        self.inner.lock().collections[index]
            .subscriber
            .deliver(snapshot);
    }

    /// Push an error through the index-th collection subscription.
    pub fn fail_collection(&self, index: usize, error: SourceError) {
        self.inner.lock().collections[index].subscriber.fail(error);
    }

    // ── document subscriptions ────────────────────────────────────────────

    pub fn document_subscriptions(&self) -> usize {
        self.inner.lock().documents.len()
    }

    pub fn document_cancelled(&self, index: usize) -> bool {
        self.inner.lock().documents[index]
            .cancelled
            .load(Ordering::SeqCst)
    }

    pub fn deliver_document(&self, index: usize, snapshot: Option<Record>) {
        self.inner.lock().documents[index]
            .subscriber
            .deliver(snapshot);
    }

    pub fn fail_document(&self, index: usize, error: SourceError) {
        self.inner.lock().documents[index].subscriber.fail(error);
    }

    // ── count requests ────────────────────────────────────────────────────

    /// Total count requests ever issued.
    pub fn count_requests(&self) -> usize {
        self.inner.lock().counts.len()
    }

    pub fn count_query(&self, index: usize) -> Arc<Q> {
        Arc::clone(&self.inner.lock().counts[index].query)
    }

    pub fn count_cancelled(&self, index: usize) -> bool {
        self.inner.lock().counts[index]
            .cancelled
            .load(Ordering::SeqCst)
    }

    /// Whether the index-th count request has been resolved already.
    pub fn count_resolved(&self, index: usize) -> bool {
        self.inner.lock().counts[index].reply.is_none()
    }

    /// Resolve the index-th count request. Panics if already resolved.
    pub fn resolve_count(&self, index: usize, result: Result<u64, SourceError>) {
        let reply = self.inner.lock().counts[index]
            .reply
            .take()
            .expect("count request already resolved");
        reply.resolve(result);
    }
}

impl<Q: Send + Sync> LiveSource<Q> for ScriptedSource<Q> {
    fn subscribe_collection(
        &self,
        query: Arc<Q>,
        subscriber: Subscriber<Vec<Record>>,
    ) -> CancelGuard {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.inner.lock().collections.push(ScriptedSub {
            query,
            subscriber,
            cancelled: Arc::clone(&cancelled),
        });
        CancelGuard::new(move || {
            cancelled.store(true, Ordering::SeqCst);
        })
    }

    fn subscribe_document(
        &self,
        query: Arc<Q>,
        subscriber: Subscriber<Option<Record>>,
    ) -> CancelGuard {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.inner.lock().documents.push(ScriptedSub {
            query,
            subscriber,
            cancelled: Arc::clone(&cancelled),
        });
        CancelGuard::new(move || {
            cancelled.store(true, Ordering::SeqCst);
        })
    }

    fn count(&self, query: Arc<Q>, reply: CountReply) -> CancelGuard {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.inner.lock().counts.push(ScriptedCount {
            query,
            reply: Some(reply),
            cancelled: Arc::clone(&cancelled),
        });
        CancelGuard::new(move || {
            cancelled.store(true, Ordering::SeqCst);
        })
    }
}
