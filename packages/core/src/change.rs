//! The record published for every committed write.

use crate::{Path, Value};

/// Stable identity of a container node in a state tree.
///
/// Ids are handed out monotonically and never reused, so a handle that
/// outlives its node can be detected rather than silently aliasing a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// A committed mutation of one property.
///
/// `previous` and `value` are plain snapshots taken at commit time. A
/// deletion carries no `value`; a property that did not exist before carries
/// no `previous`.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    /// The container that was written to.
    pub target: NodeId,
    /// The property that was written.
    pub prop: String,
    /// Full path of the written property.
    pub path: Path,
    pub previous: Option<Value>,
    pub value: Option<Value>,
}

impl Change {
    /// Whether this change removed the property.
    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }
}
