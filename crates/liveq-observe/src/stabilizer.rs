//! Query identity stabilization
//!
//! Callers typically rebuild their query descriptor on every evaluation
//! cycle, producing a fresh object that is structurally identical to the
//! previous one. The stabilizer collapses those rebuilds back onto one
//! remembered reference so everything downstream can use pointer identity
//! to decide whether the query actually changed.
//!
//! Each observer owns its own stabilizer; the remembered reference is
//! never shared across independent consumers.

use liveq_core::{Comparator, StructuralEq};
use std::sync::Arc;

/// Collapses structurally-equal query descriptors onto a stable reference.
///
/// Holds exactly one remembered reference at a time; adopting a new one
/// discards the old.
pub struct QueryStabilizer<Q> {
    remembered: Option<Arc<Q>>,
    comparator: Box<dyn Comparator<Q>>,
}

impl<Q> QueryStabilizer<Q> {
    /// Stabilizer using derived value equality
    #[inline]
    #[must_use]
    pub fn structural() -> Self
    where
        Q: PartialEq + 'static,
    {
        Self::with_comparator(StructuralEq)
    }

    /// Stabilizer using a custom comparison strategy
    #[must_use]
    pub fn with_comparator(comparator: impl Comparator<Q> + 'static) -> Self {
        Self {
            remembered: None,
            comparator: Box::new(comparator),
        }
    }

    /// Stabilize a candidate descriptor.
    ///
    /// - `None` clears the remembered reference and returns `None`.
    /// - A candidate pointer-equal to the remembered reference returns the
    ///   remembered reference without comparing.
    /// - A structurally-equal candidate is discarded in favor of the
    ///   remembered reference, preserving identity.
    /// - Anything else (including a failed comparison, which is logged and
    ///   treated as "not equal") is adopted as the new remembered reference.
    pub fn stabilize(&mut self, candidate: Option<Arc<Q>>) -> Option<Arc<Q>> {
        let Some(candidate) = candidate else {
            self.remembered = None;
            return None;
        };

        if let Some(remembered) = &self.remembered {
            if Arc::ptr_eq(remembered, &candidate) {
                return Some(Arc::clone(remembered));
            }
            match self.comparator.compare(remembered, &candidate) {
                Ok(true) => return Some(Arc::clone(remembered)),
                Ok(false) => {}
                Err(error) => {
                    // Prefer a redundant resubscription over silently
                    // reusing the wrong query.
                    tracing::warn!(%error, "descriptor comparison failed, treating queries as distinct");
                }
            }
        }

        self.remembered = Some(Arc::clone(&candidate));
        Some(candidate)
    }

    /// Currently remembered stable reference, if any
    #[inline]
    #[must_use]
    pub fn remembered(&self) -> Option<&Arc<Q>> {
        self.remembered.as_ref()
    }
}

impl<Q> std::fmt::Debug for QueryStabilizer<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStabilizer")
            .field("remembered", &self.remembered.is_some())
            .finish_non_exhaustive()
    }
}
