//! Node storage for the state tree.
//!
//! Containers live in an arena keyed by [`NodeId`]; a container's slots hold
//! either leaves or the ids of child containers. Ids are never reused, so a
//! handle to a removed node stays detectably dead instead of aliasing a newer
//! one.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use statetree_core::path::{as_index, LENGTH};
use statetree_core::{NodeId, Path, PathError, Value};

use crate::definition::{Accessor, Action, Query};
use crate::field::Field;
use crate::resource::Pending;

/// One property of a container.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    /// A leaf. Never a map or an array.
    Value(Value),
    Node(NodeId),
    Accessor { def: Rc<Accessor>, value: Value },
    Query(Rc<Query>),
    Action(Rc<Action>),
    Deferred(Pending),
}

impl Slot {
    /// The leaf value, if this slot is a plain leaf.
    pub(crate) fn as_leaf(&self) -> Option<&Value> {
        match self {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Body {
    Map(BTreeMap<String, Slot>),
    List(Vec<Slot>),
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) path: Path,
    pub(crate) frozen: bool,
    pub(crate) body: Body,
}

impl Node {
    pub(crate) fn child(&self, prop: &str) -> Option<&Slot> {
        match &self.body {
            Body::Map(map) => map.get(prop),
            Body::List(list) => list.get(as_index(prop)?),
        }
    }

    pub(crate) fn child_mut(&mut self, prop: &str) -> Option<&mut Slot> {
        match &mut self.body {
            Body::Map(map) => map.get_mut(prop),
            Body::List(list) => list.get_mut(as_index(prop)?),
        }
    }

    pub(crate) fn is_list(&self) -> bool {
        matches!(self.body, Body::List(_))
    }

    pub(crate) fn len(&self) -> usize {
        match &self.body {
            Body::Map(map) => map.len(),
            Body::List(list) => list.len(),
        }
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        match &self.body {
            Body::Map(map) => map.keys().cloned().collect(),
            Body::List(list) => (0..list.len()).map(|i| i.to_string()).collect(),
        }
    }

    /// `length` of a list, which reads like a property.
    pub(crate) fn length(&self, prop: &str) -> Option<usize> {
        match &self.body {
            Body::List(list) if prop == LENGTH => Some(list.len()),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Arena {
    nodes: HashMap<NodeId, Node>,
    next: u64,
    root: NodeId,
}

impl Default for Arena {
    fn default() -> Self {
        let mut arena = Arena {
            nodes: HashMap::new(),
            next: 0,
            root: NodeId(0),
        };
        arena.root = arena.alloc(Path::root(), false, Body::Map(BTreeMap::new()));
        arena
    }
}

impl Arena {
    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self, path: Path, frozen: bool, body: Body) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, Node { path, frozen, body });
        id
    }

    /// Drop every node and start over with an empty root map. Ids keep
    /// counting up.
    pub(crate) fn clear(&mut self) -> Vec<NodeId> {
        let freed = self.nodes.keys().copied().collect();
        self.nodes.clear();
        self.root = self.alloc(Path::root(), false, Body::Map(BTreeMap::new()));
        freed
    }

    /// Replace the root with a freshly imported container.
    pub(crate) fn replace_root(&mut self, field: Field) -> Result<Vec<NodeId>, PathError> {
        let Slot::Node(root) = self.import(field, &Path::root(), false)? else {
            return Ok(Vec::new());
        };
        let mut freed = Vec::new();
        self.free(Slot::Node(self.root), &mut freed);
        self.root = root;
        Ok(freed)
    }

    /// Find the container at `path` by walking from the root.
    pub(crate) fn node_at(&self, path: &Path) -> Option<NodeId> {
        let mut current = self.root;
        for component in path.iter() {
            match self.get(current)?.child(component)? {
                Slot::Node(id) => current = *id,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Import `field` as the content of the property at `path`.
    ///
    /// On error nothing stays allocated.
    pub(crate) fn import(
        &mut self,
        field: Field,
        path: &Path,
        frozen: bool,
    ) -> Result<Slot, PathError> {
        match field {
            Field::Value(value) => self.import_value(value, path, frozen),
            Field::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, field) in entries {
                    let imported = path
                        .child(&key)
                        .and_then(|child| self.import(field, &child, frozen));
                    match imported {
                        Ok(slot) => {
                            map.insert(key, slot);
                        }
                        Err(e) => {
                            self.free_all(map.into_values());
                            return Err(e);
                        }
                    }
                }
                Ok(Slot::Node(self.alloc(path.clone(), frozen, Body::Map(map))))
            }
            Field::List(items) => {
                let mut list = Vec::with_capacity(items.len());
                for (i, field) in items.into_iter().enumerate() {
                    let imported = path
                        .child(&i.to_string())
                        .and_then(|child| self.import(field, &child, frozen));
                    match imported {
                        Ok(slot) => list.push(slot),
                        Err(e) => {
                            self.free_all(list);
                            return Err(e);
                        }
                    }
                }
                Ok(Slot::Node(self.alloc(path.clone(), frozen, Body::List(list))))
            }
            Field::Frozen(inner) => self.import(*inner, path, true),
            Field::Accessor(def) => {
                let value = def.options.initial_value.clone();
                Ok(Slot::Accessor { def, value })
            }
            Field::Query(def) => Ok(Slot::Query(def)),
            Field::Action(def) => Ok(Slot::Action(def)),
            Field::Deferred(pending) => Ok(Slot::Deferred(pending)),
        }
    }

    fn import_value(&mut self, value: Value, path: &Path, frozen: bool) -> Result<Slot, PathError> {
        match value {
            Value::Map(map) => self.import(
                Field::Map(map.into_iter().map(|(k, v)| (k, Field::Value(v))).collect()),
                path,
                frozen,
            ),
            Value::Array(items) => self.import(
                Field::List(items.into_iter().map(Field::Value).collect()),
                path,
                frozen,
            ),
            scalar => Ok(Slot::Value(scalar)),
        }
    }

    /// Remove every node under `slot`, collecting their ids.
    pub(crate) fn free(&mut self, slot: Slot, freed: &mut Vec<NodeId>) {
        let Slot::Node(id) = slot else {
            return;
        };
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        freed.push(id);
        match node.body {
            Body::Map(map) => map.into_values().for_each(|s| self.free(s, freed)),
            Body::List(list) => list.into_iter().for_each(|s| self.free(s, freed)),
        }
    }

    fn free_all(&mut self, slots: impl IntoIterator<Item = Slot>) {
        let mut freed = Vec::new();
        for slot in slots {
            self.free(slot, &mut freed);
        }
    }

    /// A plain copy of a slot.
    pub(crate) fn snapshot(&self, slot: &Slot) -> Value {
        match slot {
            Slot::Value(v) => v.clone(),
            Slot::Node(id) => self.snapshot_node(*id),
            Slot::Accessor { value, .. } => value.clone(),
            Slot::Deferred(pending) => match pending.peek() {
                Some(Ok(Some(v))) => v.clone(),
                _ => Value::Null,
            },
            Slot::Query(_) | Slot::Action(_) => Value::Null,
        }
    }

    pub(crate) fn snapshot_node(&self, id: NodeId) -> Value {
        match self.get(id).map(|n| &n.body) {
            Some(Body::Map(map)) => Value::Map(
                map.iter()
                    .map(|(k, s)| (k.clone(), self.snapshot(s)))
                    .collect(),
            ),
            Some(Body::List(list)) => Value::Array(list.iter().map(|s| self.snapshot(s)).collect()),
            None => Value::Null,
        }
    }

    /// Move `id` (and everything below it) to `path`.
    pub(crate) fn repath(&mut self, id: NodeId, path: Path) {
        let children: Vec<(String, NodeId)> = match self.get_mut(id) {
            Some(node) => {
                node.path = path.clone();
                child_nodes(node)
            }
            None => return,
        };
        for (key, child) in children {
            if let Ok(child_path) = path.child(&key) {
                self.repath(child, child_path);
            }
        }
    }

    /// Freeze `id` and every container below it.
    ///
    /// A node that is already frozen is assumed to have frozen children.
    pub(crate) fn freeze(&mut self, id: NodeId) {
        let children = match self.get_mut(id) {
            Some(node) if !node.frozen => {
                node.frozen = true;
                child_nodes(node)
            }
            _ => return,
        };
        for (_, child) in children {
            self.freeze(child);
        }
    }
}

fn child_nodes(node: &Node) -> Vec<(String, NodeId)> {
    match &node.body {
        Body::Map(map) => map
            .iter()
            .filter_map(|(k, s)| match s {
                Slot::Node(id) => Some((k.clone(), *id)),
                _ => None,
            })
            .collect(),
        Body::List(list) => list
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Slot::Node(id) => Some((i.to_string(), *id)),
                _ => None,
            })
            .collect(),
    }
}
