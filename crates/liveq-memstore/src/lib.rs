//! LIVEQ MemStore - in-memory live document backend
//!
//! A self-contained [`LiveSource`](liveq_core::LiveSource) implementation
//! backed by process memory. Useful for demos, integration tests, and as
//! a reference for wiring real backends:
//! - Collections of JSON records in insertion order
//! - Live collection and single-record subscriptions fed full snapshots
//!   on every mutation
//! - One-shot counts resolved on spawned tasks
//! - Injectable per-collection failures for error-path testing
//!
//! # Example
//!
//! ```rust,ignore
//! use liveq_memstore::{MemStore, PathQuery};
//! use liveq_observe::CollectionObserver;
//! use std::sync::Arc;
//!
//! let store = MemStore::new();
//! let mut items = CollectionObserver::new(Arc::new(store.clone()));
//! items.observe(Some(Arc::new(PathQuery::collection("items"))));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod query;
pub mod store;

// Re-exports for convenience
pub use query::PathQuery;
pub use store::MemStore;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the in-memory store
    pub use crate::{MemStore, PathQuery};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
