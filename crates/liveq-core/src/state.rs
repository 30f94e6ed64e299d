//! Observation state delivered to consumers
//!
//! All results of this layer flow through these state structs; no error is
//! ever thrown from an observation entry point. `loading` is true from the
//! moment a new stable query is adopted until the first snapshot or error
//! for that query arrives.

use crate::error::SourceError;

/// Continuously-updated state of one live observation.
///
/// `T` is `Vec<Record>` for collection observations and `Record` for
/// single-document observations (where `data` is `None` both before the
/// first snapshot and when the underlying document does not exist).
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationState<T> {
    /// Last authoritative snapshot, if any
    pub data: Option<T>,
    /// Whether the first result for the current query is still pending
    pub loading: bool,
    /// Last backend error for the current query, if any
    pub error: Option<SourceError>,
}

impl<T> ObservationState<T> {
    /// State before any query is observed (and after teardown)
    #[inline]
    #[must_use]
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    /// State right after a new query is adopted: first result pending,
    /// last-known data retained
    #[inline]
    #[must_use]
    pub fn pending(previous: Option<T>) -> Self {
        Self {
            data: previous,
            loading: true,
            error: None,
        }
    }

    /// State carrying a fresh authoritative snapshot
    #[inline]
    #[must_use]
    pub fn ready(data: T) -> Self {
        Self {
            data: Some(data),
            loading: false,
            error: None,
        }
    }

    /// True once a snapshot has arrived and no error or reload is pending
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.data.is_some() && !self.loading && self.error.is_none()
    }
}

impl<T> Default for ObservationState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

/// Result state of a one-shot aggregate count.
///
/// Refreshed once per distinct stable query, not continuously.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountState {
    /// Last resolved count, if any
    pub count: Option<u64>,
    /// Whether a count request is in flight
    pub loading: bool,
    /// Last request failure, if any
    pub error: Option<SourceError>,
}

impl CountState {
    /// State before any query is observed (and after teardown)
    #[inline]
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }
}
