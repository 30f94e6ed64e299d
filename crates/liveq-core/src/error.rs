//! Error types for the live-query layer
//!
//! Two families of failures exist at this boundary:
//! - Backend failures (rejected or dropped subscriptions, failed count
//!   requests), surfaced through observation state rather than thrown
//! - Descriptor comparison failures, swallowed by the stabilizer and
//!   treated as "not equal"

/// Error surfaced by a backend query service.
///
/// Observers never throw these; they are delivered through the `error`
/// field of [`ObservationState`](crate::ObservationState) / and
/// [`CountState`](crate::CountState) so consumers can render a degraded
/// view. Permission and availability failures are deliberately carried
/// through the same channel - distinguishing them is a caller concern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Backend rejected the subscription or request
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Backend is unreachable or dropped the connection
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Any other backend-reported failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl SourceError {
    /// Wrap an arbitrary backend failure message
    #[inline]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// A structural comparison between two query descriptors could not be
/// completed (malformed descriptor, unsupported shape, ...).
///
/// The stabilizer logs this and conservatively treats the descriptors as
/// unequal; it is never propagated to the caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error("descriptor comparison failed: {reason}")]
pub struct ComparisonError {
    /// Human-readable cause
    pub reason: String,
}

impl ComparisonError {
    /// Create a comparison error with the given cause
    #[inline]
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
