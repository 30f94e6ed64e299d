//! LIVEQ Observe - reactive live-query observers
//!
//! The synchronization layer between UI consumers and a live document
//! backend:
//! - Stabilizes query identity across evaluation cycles
//! - Keeps collection and document observations continuously updated
//! - Resolves one-shot aggregate counts with in-flight deduplication
//! - Guarantees that results from a superseded query never overwrite the
//!   state of a newer one
//!
//! # Example
//!
//! ```rust,ignore
//! use liveq_observe::CollectionObserver;
//! use std::sync::Arc;
//!
//! let mut items = CollectionObserver::new(source);
//!
//! // Every evaluation cycle rebuilds the descriptor; the observer only
//! // resubscribes when it structurally changes.
//! let state = items.observe(Some(Arc::new(query_for(filter))));
//! if let Some(records) = &state.data {
//!     render(records);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod counter;
pub mod observer;
pub mod stabilizer;

// Re-exports for convenience
pub use counter::CountObserver;
pub use observer::{
    CollectionMode, CollectionObserver, DocumentMode, DocumentObserver, LiveObserver, ObserveMode,
};
pub use stabilizer::QueryStabilizer;

// Re-export the core vocabulary so consumers need one import
pub use liveq_core::{
    CancelGuard, Comparator, ComparisonError, CountReply, CountState, LiveSource,
    ObservationState, Record, RecordId, SourceError, StructuralEq, Subscriber,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with LIVEQ observers
    pub use crate::{
        CollectionObserver, CountObserver, CountState, DocumentObserver, LiveSource,
        ObservationState, QueryStabilizer, Record, RecordId, SourceError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
