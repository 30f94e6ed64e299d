//! LIVEQ Core - shared types for the live-query synchronization layer
//!
//! Defines the vocabulary the rest of the workspace speaks:
//! - Snapshot records and their ordering guarantees
//! - Observation state delivered to consumers
//! - The backend query-service boundary ([`LiveSource`])
//! - Pluggable descriptor comparison ([`Comparator`])
//!
//! # Example
//!
//! ```rust,ignore
//! use liveq_core::{LiveSource, Record, Subscriber};
//! use std::sync::Arc;
//!
//! fn open<Q>(source: &dyn LiveSource<Q>, query: Arc<Q>) {
//!     let subscriber = Subscriber::new(
//!         |snapshot: Vec<Record>| println!("{} records", snapshot.len()),
//!         |error| eprintln!("subscription failed: {error}"),
//!     );
//!     let _guard = source.subscribe_collection(query, subscriber);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod compare;
pub mod error;
pub mod record;
pub mod source;
pub mod state;

// Re-exports for convenience
pub use compare::{Comparator, StructuralEq};
pub use error::{ComparisonError, SourceError};
pub use record::{Record, RecordId};
pub use source::{CancelGuard, CountReply, LiveSource, Subscriber};
pub use state::{CountState, ObservationState};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with LIVEQ core types
    pub use crate::{
        CancelGuard, Comparator, CountReply, CountState, LiveSource, ObservationState, Record,
        RecordId, SourceError, Subscriber,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
