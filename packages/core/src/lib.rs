//! # statetree-core
//!
//! The data model underneath the statetree engine.
//!
//! - [`Path`] - canonical dotted addresses, with resource keys (`/users/1`)
//! - [`Value`] - the dynamically-typed tree stored at those addresses
//! - [`PathTrie`] - path-keyed lookup used for dependency matching
//! - [`ChangeBus`] - ordered fan-out of [`Change`] notifications
//! - [`DependencyTracker`] - decides whether a change affects an observer
//!
//! Nothing here knows about proxies or resources; the `statetree` crate
//! builds the reactive engine on top of these pieces.

pub mod bus;
pub mod change;
pub mod convert;
pub mod equality;
pub mod error;
pub mod path;
pub mod path_trie;
pub mod tracker;
pub mod value;

pub use bus::{ChangeBus, ListenerFn, ListenerId};
pub use change::{Change, NodeId};
pub use convert::{from_value, json_to_value, to_value, value_to_json};
pub use equality::{deep_equal, Equivalence, StructuralEquality};
pub use error::Error;
pub use path::{Path, PathError};
pub use path_trie::PathTrie;
pub use tracker::{DependencyTracker, Relation};
pub use value::Value;
