//! Backend query-service boundary
//!
//! The live-query layer consumes the backend through one trait:
//! open a change-stream subscription (snapshot callback + error callback,
//! returning a cancellation guard) and issue a one-shot aggregate count
//! (cancellable, resolved through a one-shot callback).
//!
//! Callbacks may fire from any thread and may fire synchronously during
//! the `subscribe_*`/`count` call itself; observers tolerate both.

use crate::error::SourceError;
use crate::record::Record;
use std::fmt;
use std::sync::Arc;

/// Callback pair for one live subscription.
///
/// `deliver` receives every complete, authoritative snapshot in delivery
/// order; `fail` reports a subscription error. A failed subscription may
/// keep delivering later snapshots if the backend recovers.
pub struct Subscriber<T> {
    on_snapshot: Box<dyn Fn(T) + Send + Sync>,
    on_error: Box<dyn Fn(SourceError) + Send + Sync>,
}

impl<T> Subscriber<T> {
    /// Build a subscriber from snapshot and error callbacks
    #[must_use]
    pub fn new(
        on_snapshot: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(SourceError) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_snapshot: Box::new(on_snapshot),
            on_error: Box::new(on_error),
        }
    }

    /// Push a complete snapshot to the consumer
    #[inline]
    pub fn deliver(&self, snapshot: T) {
        (self.on_snapshot)(snapshot);
    }

    /// Report a subscription error to the consumer
    #[inline]
    pub fn fail(&self, error: SourceError) {
        (self.on_error)(error);
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").finish_non_exhaustive()
    }
}

/// One-shot reply channel for an aggregate count request
pub struct CountReply {
    reply: Box<dyn FnOnce(Result<u64, SourceError>) + Send>,
}

impl CountReply {
    /// Build a reply channel from a one-shot callback
    #[must_use]
    pub fn new(reply: impl FnOnce(Result<u64, SourceError>) + Send + 'static) -> Self {
        Self {
            reply: Box::new(reply),
        }
    }

    /// Resolve the count request, consuming the channel
    #[inline]
    pub fn resolve(self, result: Result<u64, SourceError>) {
        (self.reply)(result);
    }
}

impl fmt::Debug for CountReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountReply").finish_non_exhaustive()
    }
}

/// Releases a subscription or in-flight request at the backend.
///
/// The release function runs exactly once: either through an explicit
/// [`cancel`](Self::cancel) or when the guard is dropped. Backends that
/// cannot stop callbacks immediately are still safe - observers tag every
/// callback with a generation and discard late arrivals.
pub struct CancelGuard {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl CancelGuard {
    /// Build a guard around a backend release function
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A guard with nothing to release
    #[inline]
    #[must_use]
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Release the backend resource now
    #[inline]
    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for CancelGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelGuard")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// A backend query service with a live change-stream and one-shot counts.
///
/// `Q` is the opaque query-descriptor type; descriptors are shared as
/// `Arc<Q>` so the layer above can use pointer identity as the cheap
/// "has the query changed" check.
pub trait LiveSource<Q>: Send + Sync {
    /// Open a change-stream subscription for a collection query.
    ///
    /// The backend delivers a complete snapshot on every relevant change
    /// until the returned guard is released.
    fn subscribe_collection(
        &self,
        query: Arc<Q>,
        subscriber: Subscriber<Vec<Record>>,
    ) -> CancelGuard;

    /// Open a change-stream subscription for a single record reference.
    ///
    /// Snapshots carry `None` when the record does not exist.
    fn subscribe_document(
        &self,
        query: Arc<Q>,
        subscriber: Subscriber<Option<Record>>,
    ) -> CancelGuard;

    /// Issue a one-shot aggregate count for a query.
    ///
    /// Resolves `reply` exactly once unless cancelled first.
    fn count(&self, query: Arc<Q>, reply: CountReply) -> CancelGuard;
}
