//! Live subscription observers
//!
//! [`LiveObserver`] drives one standing change-stream subscription against
//! a backend source. Two modes exist: [`CollectionMode`] (ordered record
//! snapshots) and [`DocumentMode`] (a single record reference). Both share
//! the same lifecycle:
//!
//! - `observe` stabilizes the candidate query and diffs it against the
//!   active subscription; a real change cancels the old subscription
//!   before opening the new one.
//! - Every backend callback is tagged with the generation it was opened
//!   under; callbacks from a superseded generation are discarded without
//!   touching state. This holds even when the backend cannot stop its
//!   callbacks promptly after cancellation.
//! - State flows through a `tokio::sync::watch` channel, so consumers can
//!   poll [`state`](LiveObserver::state) or await changes on
//!   [`watch`](LiveObserver::watch).

use crate::stabilizer::QueryStabilizer;
use liveq_core::{
    CancelGuard, Comparator, LiveSource, ObservationState, Record, SourceError, Subscriber,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::CollectionMode {}
    impl Sealed for super::DocumentMode {}
}

/// Shape of one observation mode: what the backend delivers and what the
/// consumer sees.
pub trait ObserveMode<Q>: sealed::Sealed + Send + Sync + 'static {
    /// Payload pushed by the backend per snapshot
    type Payload: Send + Sync + 'static;
    /// Data type held in the observation state
    type View: Clone + Send + Sync + 'static;

    /// Open the matching change-stream subscription on the source
    fn open(
        source: &dyn LiveSource<Q>,
        query: Arc<Q>,
        subscriber: Subscriber<Self::Payload>,
    ) -> CancelGuard;

    /// Map a delivered payload into state data
    fn view(payload: Self::Payload) -> Option<Self::View>;
}

/// Ordered collection snapshots
#[derive(Debug, Clone, Copy)]
pub struct CollectionMode;

impl<Q> ObserveMode<Q> for CollectionMode {
    type Payload = Vec<Record>;
    type View = Vec<Record>;

    fn open(
        source: &dyn LiveSource<Q>,
        query: Arc<Q>,
        subscriber: Subscriber<Self::Payload>,
    ) -> CancelGuard {
        source.subscribe_collection(query, subscriber)
    }

    #[inline]
    fn view(payload: Self::Payload) -> Option<Self::View> {
        Some(payload)
    }
}

/// A single record reference; snapshots carry `None` when the record
/// does not exist
#[derive(Debug, Clone, Copy)]
pub struct DocumentMode;

impl<Q> ObserveMode<Q> for DocumentMode {
    type Payload = Option<Record>;
    type View = Record;

    fn open(
        source: &dyn LiveSource<Q>,
        query: Arc<Q>,
        subscriber: Subscriber<Self::Payload>,
    ) -> CancelGuard {
        source.subscribe_document(query, subscriber)
    }

    #[inline]
    fn view(payload: Self::Payload) -> Option<Self::View> {
        payload
    }
}

/// Shared between the observer and the callbacks of every subscription it
/// has ever opened. The generation lock serializes state application
/// against generation bumps, so a callback that loses the race against a
/// query change can never overwrite the newer query's state.
struct Shared<V> {
    generation: Mutex<u64>,
    tx: watch::Sender<ObservationState<V>>,
}

impl<V: Clone + Send + Sync + 'static> Shared<V> {
    fn bump(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        *generation
    }

    fn apply_snapshot(&self, generation: u64, data: Option<V>) {
        let current = self.generation.lock();
        if *current != generation {
            tracing::debug!(
                generation,
                current = *current,
                "discarding snapshot from superseded subscription"
            );
            return;
        }
        self.tx.send_modify(|state| {
            state.data = data;
            state.loading = false;
            state.error = None;
        });
    }

    fn apply_error(&self, generation: u64, error: SourceError) {
        let current = self.generation.lock();
        if *current != generation {
            tracing::debug!(
                generation,
                current = *current,
                %error,
                "discarding error from superseded subscription"
            );
            return;
        }
        tracing::debug!(%error, "live subscription reported an error");
        // Keep the last-known data so consumers can render a degraded view.
        self.tx.send_modify(|state| {
            state.loading = false;
            state.error = Some(error);
        });
    }
}

struct Active<Q> {
    query: Arc<Q>,
    guard: CancelGuard,
}

/// Observes one continuously-updating backend query.
///
/// Use the [`CollectionObserver`] / [`DocumentObserver`] aliases.
///
/// # Example
///
/// ```rust,ignore
/// let mut observer = CollectionObserver::new(source);
/// // Each evaluation cycle rebuilds the descriptor; identical rebuilds
/// // do not resubscribe.
/// let state = observer.observe(Some(Arc::new(open_items_query())));
/// ```
pub struct LiveObserver<Q, M: ObserveMode<Q>> {
    source: Arc<dyn LiveSource<Q>>,
    stabilizer: QueryStabilizer<Q>,
    shared: Arc<Shared<M::View>>,
    active: Option<Active<Q>>,
}

/// Observer over an ordered collection query
pub type CollectionObserver<Q> = LiveObserver<Q, CollectionMode>;

/// Observer over a single record reference
pub type DocumentObserver<Q> = LiveObserver<Q, DocumentMode>;

impl<Q, M> LiveObserver<Q, M>
where
    Q: Send + Sync + 'static,
    M: ObserveMode<Q>,
{
    /// Observer using derived value equality for query stabilization
    #[must_use]
    pub fn new(source: Arc<dyn LiveSource<Q>>) -> Self
    where
        Q: PartialEq,
    {
        Self::with_stabilizer(source, QueryStabilizer::structural())
    }

    /// Observer using a custom descriptor comparison strategy
    #[must_use]
    pub fn with_comparator(
        source: Arc<dyn LiveSource<Q>>,
        comparator: impl Comparator<Q> + 'static,
    ) -> Self {
        Self::with_stabilizer(source, QueryStabilizer::with_comparator(comparator))
    }

    fn with_stabilizer(source: Arc<dyn LiveSource<Q>>, stabilizer: QueryStabilizer<Q>) -> Self {
        let (tx, _rx) = watch::channel(ObservationState::idle());
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

    /// Evaluate a candidate query and return the current observation state.
    ///
    /// Call this once per evaluation cycle with the freshly-built
    /// descriptor (or `None` to stop observing). Identical rebuilds are
    /// collapsed by the stabilizer and leave the subscription untouched; a
    /// real change cancels the previous subscription, marks the state
    /// loading, and opens a new one. Never returns an error - backend
    /// failures surface through [`ObservationState::error`].
    pub fn observe(&mut self, candidate: Option<Arc<Q>>) -> ObservationState<M::View> {
        let stable = self.stabilizer.stabilize(candidate);

        let unchanged = match (&self.active, &stable) {
            (Some(active), Some(stable)) => Arc::ptr_eq(&active.query, stable),
            (None, None) => true,
            _ => false,
        };

        if !unchanged {
            match stable {
                Some(query) => self.open(query),
                None => self.teardown(),
            }
        }

        self.state()
    }

    /// Current observation state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ObservationState<M::View> {
        self.shared.tx.borrow().clone()
    }

    /// Receiver that resolves whenever the observation state changes
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ObservationState<M::View>> {
        self.shared.tx.subscribe()
    }

    /// Stable reference of the query currently observed, if any
    #[inline]
    #[must_use]
    pub fn query(&self) -> Option<&Arc<Q>> {
        self.active.as_ref().map(|active| &active.query)
    }

    fn open(&mut self, query: Arc<Q>) {
        // Bump first: once the new generation is visible, nothing from the
        // previous subscription can touch state, whether or not the backend
        // honors the cancellation promptly.
        let generation = self.shared.bump();

        if let Some(previous) = self.active.take() {
            tracing::trace!("cancelling superseded subscription");
            previous.guard.cancel();
        }

        self.shared.tx.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let on_snapshot = Arc::clone(&self.shared);
        let on_error = Arc::clone(&self.shared);
        let subscriber = Subscriber::new(
            move |payload| on_snapshot.apply_snapshot(generation, M::view(payload)),
            move |error| on_error.apply_error(generation, error),
        );

        let guard = M::open(self.source.as_ref(), Arc::clone(&query), subscriber);
        self.active = Some(Active { query, guard });
    }

    fn teardown(&mut self) {
        let _generation = self.shared.bump();

        if let Some(previous) = self.active.take() {
            tracing::trace!("tearing down live subscription");
            previous.guard.cancel();
        }

        self.shared.tx.send_modify(|state| {
            *state = ObservationState::idle();
        });
    }
}

impl<Q, M: ObserveMode<Q>> Drop for LiveObserver<Q, M> {
    fn drop(&mut self) {
        // Invalidate every outstanding callback; the active guard (dropped
        // with self) releases the subscription at the backend.
        let mut generation = self.shared.generation.lock();
        *generation += 1;
    }
}

impl<Q, M: ObserveMode<Q>> std::fmt::Debug for LiveObserver<Q, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveObserver")
            .field("active", &self.active.is_some())
            .finish_non_exhaustive()
    }
}
