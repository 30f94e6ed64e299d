//! One-shot aggregate counts
//!
//! Unlike the live observers, [`CountObserver`] opens no standing
//! subscription: each distinct stable query triggers exactly one count
//! request, and the result is held until the query identity changes or
//! the caller explicitly refreshes. Stale results from a superseded
//! request are discarded by the same generation rule the live observers
//! use.

use crate::stabilizer::QueryStabilizer;
use liveq_core::{CancelGuard, Comparator, CountReply, CountState, LiveSource, SourceError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

struct Shared {
    generation: Mutex<u64>,
    tx: watch::Sender<CountState>,
}

impl Shared {
    fn bump(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        *generation
    }

    fn apply(&self, generation: u64, result: Result<u64, SourceError>) {
        let current = self.generation.lock();
        if *current != generation {
            tracing::debug!(
                generation,
                current = *current,
                "discarding count result from superseded request"
            );
            return;
        }
        self.tx.send_modify(|state| match result {
            Ok(count) => {
                state.count = Some(count);
                state.loading = false;
                state.error = None;
            }
            Err(error) => {
                // Keep the last-known count on failure.
                state.loading = false;
                state.error = Some(error);
            }
        });
    }
}

struct Active<Q> {
    query: Arc<Q>,
    guard: CancelGuard,
}

/// Resolves an aggregate count once per distinct stable query.
///
/// While a request for the current query is in flight, re-observing the
/// same query issues no duplicate request; a changed query always does.
pub struct CountObserver<Q> {
    source: Arc<dyn LiveSource<Q>>,
    stabilizer: QueryStabilizer<Q>,
    shared: Arc<Shared>,
    active: Option<Active<Q>>,
}

impl<Q> CountObserver<Q>
where
    Q: Send + Sync + 'static,
{
    /// Counter using derived value equality for query stabilization
    #[must_use]
    pub fn new(source: Arc<dyn LiveSource<Q>>) -> Self
    where
        Q: PartialEq,
    {
        Self::with_stabilizer(source, QueryStabilizer::structural())
    }

    /// Counter using a custom descriptor comparison strategy
    #[must_use]
    pub fn with_comparator(
        source: Arc<dyn LiveSource<Q>>,
        comparator: impl Comparator<Q> + 'static,
    ) -> Self {
        Self::with_stabilizer(source, QueryStabilizer::with_comparator(comparator))
    }

    fn with_stabilizer(source: Arc<dyn LiveSource<Q>>, stabilizer: QueryStabilizer<Q>) -> Self {
        let (tx, _rx) = watch::channel(CountState::idle());
        Self {
            source,
            stabilizer,
            shared: Arc::new(Shared {
                generation: Mutex::new(0),
                tx,
            }),
            active: None,
        }
    }

    /// Evaluate a candidate query and return the current count state.
    ///
    /// Issues a count request only when the stable query identity changes;
    /// `None` cancels any in-flight request and resets the state. Request
    /// failures surface through [`CountState::error`], never as a panic or
    /// return error.
    pub fn observe(&mut self, candidate: Option<Arc<Q>>) -> CountState {
        let stable = self.stabilizer.stabilize(candidate);

        let unchanged = match (&self.active, &stable) {
            (Some(active), Some(stable)) => Arc::ptr_eq(&active.query, stable),
            (None, None) => true,
            _ => false,
        };

        if !unchanged {
            match stable {
                Some(query) => self.issue(query),
                None => self.reset(),
            }
        }

        self.state()
    }

    /// Re-run the count for the currently observed query, if any.
    ///
    /// The one escape hatch from "one request per distinct query":
    /// consumers that know the aggregate is stale (e.g. after a write of
    /// their own) can trigger a fresh request without changing the query.
    pub fn refresh(&mut self) -> CountState {
        if let Some(query) = self.active.as_ref().map(|active| Arc::clone(&active.query)) {
            self.issue(query);
        }
        self.state()
    }

    /// Current count state
    #[inline]
    #[must_use]
    pub fn state(&self) -> CountState {
        self.shared.tx.borrow().clone()
    }

    /// Receiver that resolves whenever the count state changes
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<CountState> {
        self.shared.tx.subscribe()
    }

    /// Stable reference of the query currently observed, if any
    #[inline]
    #[must_use]
    pub fn query(&self) -> Option<&Arc<Q>> {
        self.active.as_ref().map(|active| &active.query)
    }

    fn issue(&mut self, query: Arc<Q>) {
        let generation = self.shared.bump();

        if let Some(previous) = self.active.take() {
            previous.guard.cancel();
        }

        self.shared.tx.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let shared = Arc::clone(&self.shared);
        let reply = CountReply::new(move |result| shared.apply(generation, result));

        let guard = self.source.count(Arc::clone(&query), reply);
        self.active = Some(Active { query, guard });
    }

    fn reset(&mut self) {
        let _generation = self.shared.bump();

        if let Some(previous) = self.active.take() {
            previous.guard.cancel();
        }

        self.shared.tx.send_modify(|state| {
            *state = CountState::idle();
        });
    }
}

impl<Q> Drop for CountObserver<Q> {
    fn drop(&mut self) {
        let mut generation = self.shared.generation.lock();
        *generation += 1;
    }
}

impl<Q> std::fmt::Debug for CountObserver<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountObserver")
            .field("active", &self.active.is_some())
            .finish_non_exhaustive()
    }
}
