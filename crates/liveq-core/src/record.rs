//! Snapshot records
//!
//! A [`Record`] is one backend-delivered entity: a unique key plus its
//! fields as delivered. Ordering of records inside a snapshot is
//! backend-defined and preserved by keeping snapshots as `Vec<Record>` -
//! this layer never re-sorts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique key of a record within its collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Create a record id from any string-like value
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View the id as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One backend entity mapped into the shape consumers work with:
/// the unique key merged alongside the delivered fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique key within the collection
    pub id: RecordId,
    /// Fields exactly as delivered by the backend
    pub fields: serde_json::Value,
}

impl Record {
    /// Create a record from an id and its fields
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<RecordId>, fields: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Look up a top-level field by name
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }
}
