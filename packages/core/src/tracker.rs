//! Per-observer dependency tracking.
//!
//! An observer records every path it reads during a pass. When a change is
//! published, the tracker relates the changed path to the recorded ones:
//!
//! - **exact**: the changed path itself was read
//! - **ancestor**: something above the changed path was read (for example the
//!   key set of a container), so any change below it counts
//! - **descendant**: something below the changed path was read, so the
//!   recorded sub-paths are compared between the old and new snapshots and
//!   only a real difference counts

use crate::{Change, Equivalence, Path, PathTrie, StructuralEquality};

/// Why a change invalidates an observer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    Exact,
    /// The recorded path is a proper ancestor of the changed path.
    Ancestor(Path),
    /// The recorded path lies below the changed path and its value differs.
    Descendant(Path),
}

/// The set of paths read during one pass, in first-read order.
#[derive(Debug, Default, Clone)]
pub struct DependencyTracker {
    paths: Vec<Path>,
    index: PathTrie<()>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every recorded path. Called at the start of a pass.
    pub fn reset(&mut self) {
        self.paths.clear();
        self.index.clear();
    }

    /// Record a read. Returns `false` if the path was already recorded.
    pub fn on_get(&mut self, path: &Path) -> bool {
        if self.index.contains_value(path) {
            return false;
        }
        self.index.insert(path, ());
        self.paths.push(path.clone());
        true
    }

    /// Recorded paths in first-read order.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_value(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Decide whether `change` affects the recorded reads, comparing
    /// descendants with [`StructuralEquality`].
    pub fn should_invalidate(&self, change: &Change) -> Option<Relation> {
        self.should_invalidate_with(change, &StructuralEquality)
    }

    /// Like [`DependencyTracker::should_invalidate`] with a custom strategy.
    pub fn should_invalidate_with(
        &self,
        change: &Change,
        equivalence: &dyn Equivalence,
    ) -> Option<Relation> {
        if self.index.contains_value(&change.path) {
            return Some(Relation::Exact);
        }

        if let Some((ancestor, _)) = self.index.find_proper_ancestor(&change.path) {
            return Some(Relation::Ancestor(ancestor));
        }

        for (suffix, _) in self.index.descendants(&change.path) {
            let previous = change.previous.as_ref().and_then(|v| v.lookup(&suffix));
            let current = change.value.as_ref().and_then(|v| v.lookup(&suffix));
            if !equivalence.equivalent(previous.as_deref(), current.as_deref()) {
                let mut full = change.path.components.clone();
                full.extend(suffix.components);
                return Some(Relation::Descendant(Path { components: full }));
            }
        }

        None
    }
}
