//! Path-based query descriptors for the in-memory store
//!
//! A [`PathQuery`] names a collection, optionally a single record inside
//! it, and an optional result limit. Derived value equality makes it work
//! with the default structural comparator out of the box.

use liveq_core::RecordId;

/// Query descriptor understood by the in-memory store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathQuery {
    path: String,
    doc_id: Option<RecordId>,
    limit: Option<usize>,
}

impl PathQuery {
    /// Query over a whole collection
    #[inline]
    #[must_use]
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            doc_id: None,
            limit: None,
        }
    }

    /// Reference to a single record within a collection
    #[inline]
    #[must_use]
    pub fn document(path: impl Into<String>, id: impl Into<RecordId>) -> Self {
        Self {
            path: path.into(),
            doc_id: Some(id.into()),
            limit: None,
        }
    }

    /// Cap the number of records per snapshot
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Collection path this query targets
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Record reference, for document queries
    #[inline]
    #[must_use]
    pub fn doc_id(&self) -> Option<&RecordId> {
        self.doc_id.as_ref()
    }

    /// Snapshot size cap, if any
    #[inline]
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}
