//! A generic prefix trie keyed by path components.
//!
//! `PathTrie<T>` provides O(k) operations where k is the path depth.
//! Each node can optionally hold a value, and has children indexed by path component.
//! The dependency tracker uses it to answer "is any recorded path an
//! ancestor of, or below, this changed path" without scanning every entry.

use crate::Path;
use std::collections::BTreeMap;

/// A prefix trie keyed by path components.
///
/// # Example
///
/// ```rust
/// use statetree_core::{PathTrie, path};
///
/// let mut trie: PathTrie<i32> = PathTrie::new();
/// trie.insert(&path!("a.b"), 1);
/// trie.insert(&path!("a.b.c"), 2);
///
/// assert_eq!(trie.get(&path!("a.b")), Some(&1));
///
/// let (ancestor, value) = trie.find_proper_ancestor(&path!("a.b.c.d")).unwrap();
/// assert_eq!(ancestor, path!("a.b"));
/// assert_eq!(*value, 1);
/// ```
#[derive(Debug, Clone)]
pub struct PathTrie<T> {
    value: Option<T>,
    children: BTreeMap<String, PathTrie<T>>,
}

impl<T> Default for PathTrie<T> {
    fn default() -> Self {
        Self {
            value: None,
            children: BTreeMap::new(),
        }
    }
}

impl<T> PathTrie<T> {
    /// Create an empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_create_node(&mut self, path: &Path) -> &mut PathTrie<T> {
        let mut current = self;
        for component in &path.components {
            current = current.children.entry(component.clone()).or_default();
        }
        current
    }

    fn get_node(&self, path: &Path) -> Option<&PathTrie<T>> {
        let mut current = self;
        for component in &path.components {
            current = current.children.get(component)?;
        }
        Some(current)
    }

    fn get_node_mut(&mut self, path: &Path) -> Option<&mut PathTrie<T>> {
        let mut current = self;
        for component in &path.components {
            current = current.children.get_mut(component)?;
        }
        Some(current)
    }

    /// Insert a value at path. Returns previous value if any.
    pub fn insert(&mut self, path: &Path, value: T) -> Option<T> {
        self.get_or_create_node(path).value.replace(value)
    }

    /// Remove and return value at exact path. Children remain.
    pub fn remove(&mut self, path: &Path) -> Option<T> {
        self.get_node_mut(path)?.value.take()
    }

    /// Get reference to value at exact path.
    pub fn get(&self, path: &Path) -> Option<&T> {
        self.get_node(path)?.value.as_ref()
    }

    /// Get reference to subtrie at path.
    pub fn get_subtrie(&self, path: &Path) -> Option<&PathTrie<T>> {
        self.get_node(path)
    }

    /// Check if exact path has a value.
    pub fn contains_value(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Count of values in trie (not nodes).
    pub fn len(&self) -> usize {
        let self_count = usize::from(self.value.is_some());
        let children_count: usize = self.children.values().map(PathTrie::len).sum();
        self_count + children_count
    }

    /// True if no values anywhere in trie.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.values().all(PathTrie::is_empty)
    }

    /// Remove every value.
    pub fn clear(&mut self) {
        self.value = None;
        self.children.clear();
    }

    /// Find the shallowest entry strictly above `path`.
    ///
    /// The root entry (empty path) is an ancestor of every non-empty path.
    pub fn find_proper_ancestor(&self, path: &Path) -> Option<(Path, &T)> {
        let mut current = self;
        for depth in 0..path.len() {
            if let Some(value) = current.value.as_ref() {
                return Some((path.slice(0, depth), value));
            }
            current = current.children.get(&path.components[depth])?;
        }
        None
    }

    /// Iterate over entries strictly below `path`, keyed by their suffix
    /// relative to `path`.
    pub fn descendants(&self, path: &Path) -> impl Iterator<Item = (Path, &T)> {
        self.get_node(path)
            .into_iter()
            .flat_map(|node| node.iter())
            .filter(|(suffix, _)| !suffix.is_empty())
    }

    /// Iterate over all (path, value) pairs, parents before children.
    pub fn iter(&self) -> PathTrieIter<'_, T> {
        PathTrieIter {
            stack: vec![(Path::root(), self)],
        }
    }
}

/// Iterator over (Path, &T) pairs in a PathTrie.
pub struct PathTrieIter<'a, T> {
    stack: Vec<(Path, &'a PathTrie<T>)>,
}

impl<'a, T> Iterator for PathTrieIter<'a, T> {
    type Item = (Path, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, node)) = self.stack.pop() {
            for (name, child) in node.children.iter().rev() {
                let mut components = path.components.clone();
                components.push(name.clone());
                self.stack.push((Path { components }, child));
            }

            if let Some(value) = node.value.as_ref() {
                return Some((path, value));
            }
        }
        None
    }
}
