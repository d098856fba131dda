//! # statetree
//!
//! A reactive state tree with fine-grained dependency tracking.
//!
//! The tree lives in a [`Store`]. Everything else reaches it through
//! [`Proxy`] handles:
//!
//! - reads resolve accessors, queries and async resources, and hand out one
//!   cached handle per container
//! - writes publish a [`Change`] only when the stored value really changed
//! - an [`Observer`] records which paths a read pass touched and is told
//!   when a change affects them
//!
//! Reads that depend on data still being fetched fail with
//! [`Error::Suspended`], carrying the shared [`Pending`] handle of the one
//! in-flight request; await it and read again (or use [`until_ready`]).
//!
//! ```rust
//! use statetree::{Field, Store};
//!
//! let store = Store::new();
//! store
//!     .replace_state(Field::map([("count", Field::from(0))]))
//!     .unwrap();
//!
//! let observer = store.observe();
//! let state = observer.begin().unwrap();
//! assert_eq!(state.get("count").unwrap().as_i64(), Some(0));
//!
//! store.state().set("count", 1).unwrap();
//! assert!(observer.is_stale());
//! ```

/// `log::debug!`, but only when the store's debug flag is on.
macro_rules! debug_log {
    ($shared:expr, $($arg:tt)+) => {
        if $shared.debug() {
            log::debug!($($arg)+);
        }
    };
}

mod arena;
pub mod config;
pub mod definition;
pub mod error;
pub mod field;
mod merge;
pub mod observer;
pub mod proxy;
pub mod resource;
pub mod store;
pub mod suspense;

pub use config::StoreConfig;
pub use definition::{
    accessor, action, deferred, query, tracked_action, AccessorOptions, BoundAction, ManualSet,
};
pub use error::{Error, Result};
pub use field::Field;
pub use observer::Observer;
pub use proxy::{Proxy, Read};
pub use resource::{
    Method, Pending, ResolveError, ResolveFuture, ResolveOptions, ResolveResult, Resolver,
    ResourceOptions, ResourceStatus,
};
pub use store::{Listener, Store};
pub use suspense::until_ready;

pub use statetree_core::{path, Change, Equivalence, Path, PathError, Relation, Value};
