//! Handles into the state tree.
//!
//! A [`Proxy`] wraps one container node. Reading a property resolves
//! accessors, queries, resources and deferred values, hands out the (cached)
//! handle of a child container, and records the read with the observer the
//! handle belongs to. Writing a property detects whether the stored value
//! really changed and publishes a [`Change`] when it did.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::de::DeserializeOwned;
use statetree_core::path::{as_index, is_resource_key, LENGTH};
use statetree_core::{from_value, Change, NodeId, Path, PathError, Value};

use crate::arena::{Body, Slot};
use crate::definition::{Accessor, BoundAction, ManualSet};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::observer::ObserverState;
use crate::store::{Shared, Store};

/// Reads as the root handle.
pub const ROOT: &str = "$root";
/// Reads as the top-level container this handle lives under.
pub const MODEL: &str = "$model";
/// Reads as a plain snapshot of the handle's container.
pub const RAW: &str = "$raw";

fn is_protected(prop: &str) -> bool {
    matches!(prop, ROOT | MODEL | RAW)
}

/// Who is reading through a handle.
#[derive(Clone)]
pub(crate) enum View {
    /// Untracked access through the store.
    Store,
    /// Reads are recorded with this observer.
    Observer(Weak<ObserverState>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// An ordinary assignment; accessors intercept it.
    Assign,
    /// Replace whatever the property holds, definitions included.
    Define,
}

struct ProxyInner {
    shared: Weak<Shared>,
    node: NodeId,
    view: View,
    /// Where the node was last seen, for handles that outlive it.
    last_path: RefCell<Path>,
}

/// A handle on one container of the tree.
///
/// Handles are cached: reading the same container twice through the same
/// store (or observer) yields the same handle, so [`Proxy::ptr_eq`] can stand
/// in for "nothing was replaced here".
#[derive(Clone)]
pub struct Proxy {
    inner: Rc<ProxyInner>,
}

/// The result of reading one property.
#[derive(Clone, Debug)]
pub enum Read {
    /// The property does not exist.
    Absent,
    /// A leaf, or a plain copy of a frozen container.
    Value(Value),
    /// A child container.
    Node(Proxy),
    /// A function field.
    Action(BoundAction),
}

impl Read {
    pub fn is_absent(&self) -> bool {
        matches!(self, Read::Absent)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Read::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Read::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<&Proxy> {
        match self {
            Read::Node(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn into_node(self) -> Option<Proxy> {
        match self {
            Read::Node(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<&BoundAction> {
        match self {
            Read::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value().and_then(Value::as_bool)
    }

    /// A plain copy of what was read. Containers are snapshotted; absent
    /// properties and actions are `null`.
    pub fn to_value(&self) -> Result<Value> {
        match self {
            Read::Absent | Read::Action(_) => Ok(Value::Null),
            Read::Value(v) => Ok(v.clone()),
            Read::Node(proxy) => proxy.unwrap(),
        }
    }

    /// Deserialize what was read.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(from_value(self.to_value()?)?)
    }
}

impl PartialEq for Read {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Read::Absent, Read::Absent) => true,
            (Read::Value(a), Read::Value(b)) => a == b,
            (Read::Node(a), Read::Node(b)) => a.ptr_eq(b),
            (Read::Action(a), Read::Action(b)) => a == b,
            _ => false,
        }
    }
}

impl Proxy {
    pub(crate) fn new(shared: Weak<Shared>, node: NodeId, view: View, path: Path) -> Self {
        Self {
            inner: Rc::new(ProxyInner {
                shared,
                node,
                view,
                last_path: RefCell::new(path),
            }),
        }
    }

    fn shared(&self) -> Result<Rc<Shared>> {
        self.inner.shared.upgrade().ok_or(Error::Detached)
    }

    /// Whether both handles are the same handle.
    pub fn ptr_eq(&self, other: &Proxy) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The store this handle belongs to.
    pub fn store(&self) -> Result<Store> {
        Ok(Store::from_shared(self.shared()?))
    }

    /// The path of this handle's container.
    pub fn path(&self) -> Path {
        if let Some(shared) = self.inner.shared.upgrade() {
            if let Some(node) = shared.inner.borrow().arena.get(self.inner.node) {
                let path = node.path.clone();
                *self.inner.last_path.borrow_mut() = path.clone();
                return path;
            }
        }
        self.inner.last_path.borrow().clone()
    }

    /// The root handle, in the same view as this one.
    pub fn root(&self) -> Result<Proxy> {
        let shared = self.shared()?;
        Ok(self.root_in(&shared))
    }

    fn root_in(&self, shared: &Rc<Shared>) -> Proxy {
        shared.proxy_for(shared.root(), &self.inner.view)
    }

    /// The top-level property this handle lives under, or the root for the
    /// root itself.
    pub fn model(&self) -> Result<Read> {
        let root = self.root()?;
        match self.path().first() {
            Some(model) => root.get(model),
            None => Ok(Read::Node(root)),
        }
    }

    /// A plain copy of this container.
    pub fn unwrap(&self) -> Result<Value> {
        let shared = self.shared()?;
        let id = self.locate(&shared)?;
        let inner = shared.inner.borrow();
        Ok(inner.arena.snapshot_node(id))
    }

    /// The node this handle reads from.
    ///
    /// A handle under a resource key makes sure the resource is loaded, and
    /// follows it to the current node when the response has been replaced.
    fn locate(&self, shared: &Rc<Shared>) -> Result<NodeId> {
        let path = self.path();
        if let Some(key) = path.resource_key() {
            shared.ensure_resource(key)?;
        }

        if shared.inner.borrow().arena.contains(self.inner.node) {
            return Ok(self.inner.node);
        }
        if path.is_resource() {
            let found = shared.inner.borrow().arena.node_at(&path);
            if let Some(id) = found {
                return Ok(id);
            }
        }
        Err(Error::Detached)
    }

    fn track(&self, shared: &Shared, path: &Path) {
        let View::Observer(observer) = &self.inner.view else {
            return;
        };
        if let Some(observer) = observer.upgrade() {
            if observer.tracker.borrow_mut().on_get(path) {
                debug_log!(shared, "tracked {}", path);
            }
        }
    }

    /// Read one property.
    ///
    /// Fails with [`Error::Suspended`] while a resource or deferred value it
    /// depends on is in flight.
    pub fn get(&self, prop: &str) -> Result<Read> {
        match prop {
            ROOT => return self.root().map(Read::Node),
            MODEL => return self.model(),
            RAW => return self.unwrap().map(Read::Value),
            _ => {}
        }

        let shared = self.shared()?;
        if is_resource_key(prop) {
            return shared.read_resource(prop, &self.inner.view);
        }
        let id = self.locate(&shared)?;
        self.read_child(&shared, id, prop)
    }

    pub(crate) fn read_child(&self, shared: &Rc<Shared>, id: NodeId, prop: &str) -> Result<Read> {
        let (path, frozen, slot, length) = {
            let inner = shared.inner.borrow();
            let node = inner.arena.get(id).ok_or(Error::Detached)?;
            (
                node.path.child(prop)?,
                node.frozen,
                node.child(prop).cloned(),
                node.length(prop),
            )
        };

        if frozen {
            let inner = shared.inner.borrow();
            return Ok(match (&slot, length) {
                (Some(slot), _) => Read::Value(inner.arena.snapshot(slot)),
                (None, Some(len)) => Read::Value(Value::from(len)),
                (None, None) => Read::Absent,
            });
        }

        match slot {
            None => {
                self.track(shared, &path);
                Ok(length.map_or(Read::Absent, |len| Read::Value(Value::from(len))))
            }
            Some(Slot::Value(value)) => {
                self.track(shared, &path);
                Ok(Read::Value(value))
            }
            Some(Slot::Node(child)) => {
                let snapshot = {
                    let inner = shared.inner.borrow();
                    match inner.arena.get(child) {
                        Some(node) if node.frozen => Some(inner.arena.snapshot_node(child)),
                        _ => None,
                    }
                };
                match snapshot {
                    Some(value) => {
                        self.track(shared, &path);
                        Ok(Read::Value(value))
                    }
                    None => Ok(Read::Node(shared.proxy_for(child, &self.inner.view))),
                }
            }
            Some(Slot::Accessor { def, value }) => {
                let value = match &def.options.on_get {
                    Some(on_get) => on_get(&self.root_in(shared), value)?,
                    None => value,
                };
                self.track(shared, &path);
                Ok(Read::Value(value))
            }
            Some(Slot::Query(def)) => {
                self.track(shared, &path);
                let container = shared.proxy_for(id, &View::Store);
                match (def.derive)(&container)? {
                    Some(key) if !key.is_empty() => {
                        debug_log!(shared, "{} derived {}", path, key);
                        shared.read_resource(&key, &self.inner.view)
                    }
                    _ => Ok(Read::Absent),
                }
            }
            Some(Slot::Action(def)) => {
                if def.tracked {
                    self.track(shared, &path);
                }
                Ok(Read::Action(BoundAction {
                    action: def,
                    this: shared.proxy_for(id, &self.inner.view),
                    root: self.root_in(shared),
                }))
            }
            Some(Slot::Deferred(pending)) => match pending.peek() {
                None => {
                    debug_log!(shared, "{} is not ready", path);
                    Err(Error::Suspended(pending.clone()))
                }
                Some(Err(error)) => Err(Error::Fetch(error.clone())),
                Some(Ok(value)) => {
                    let value = value.clone().unwrap_or_default();
                    {
                        let mut inner = shared.inner.borrow_mut();
                        let waiting = matches!(
                            inner.arena.get(id).and_then(|n| n.child(prop)),
                            Some(Slot::Deferred(p)) if p.ptr_eq(&pending)
                        );
                        if waiting {
                            let slot = inner.arena.import(Field::Value(value), &path, false)?;
                            if let Some(target) =
                                inner.arena.get_mut(id).and_then(|n| n.child_mut(prop))
                            {
                                *target = slot;
                            }
                            debug_log!(shared, "{} settled", path);
                        }
                    }
                    self.read_child(shared, id, prop)
                }
            },
        }
    }

    /// Read a dotted path below this container.
    ///
    /// Containers are walked through their handles, plain values (frozen
    /// subtrees, accessor results) by lookup. Walking past a leaf reads as
    /// absent.
    pub fn at(&self, path: &str) -> Result<Read> {
        let parsed = Path::parse(path)?;
        let mut current = Read::Node(self.clone());
        for component in parsed.iter() {
            current = match current {
                Read::Node(proxy) => proxy.get(component)?,
                Read::Value(value) => {
                    let step = Path::root().child(component)?;
                    value
                        .lookup(&step)
                        .map_or(Read::Absent, |v| Read::Value(v.into_owned()))
                }
                Read::Absent | Read::Action(_) => return Ok(Read::Absent),
            };
        }
        Ok(current)
    }

    /// Assign one property.
    ///
    /// Maps and arrays in `field` become containers. An accessor stored at
    /// `prop` intercepts the assignment.
    pub fn set(&self, prop: &str, field: impl Into<Field>) -> Result<()> {
        self.write(prop, field.into(), Mode::Assign)
    }

    /// Replace whatever `prop` holds, bypassing any accessor stored there.
    pub(crate) fn define(&self, prop: &str, field: Field) -> Result<()> {
        self.write(prop, field, Mode::Define)
    }

    fn write(&self, prop: &str, field: Field, mode: Mode) -> Result<()> {
        if is_protected(prop) {
            return Err(Error::Protected {
                prop: prop.to_string(),
            });
        }

        let shared = self.shared()?;
        if is_resource_key(prop) {
            let root = shared.root();
            if root != self.inner.node {
                return shared
                    .proxy_for(root, &self.inner.view)
                    .write(prop, field, mode);
            }
        }
        let id = self.locate(&shared)?;

        let (path, frozen, is_list, accessor) = {
            let inner = shared.inner.borrow();
            let node = inner.arena.get(id).ok_or(Error::Detached)?;
            let accessor = match node.child(prop) {
                Some(Slot::Accessor { def, value }) if mode == Mode::Assign => {
                    Some((Rc::clone(def), value.clone()))
                }
                _ => None,
            };
            (node.path.child(prop)?, node.frozen, node.is_list(), accessor)
        };

        if frozen {
            return Err(Error::Frozen { path });
        }
        if let Some((def, old)) = accessor {
            return self.write_accessor(&shared, id, prop, path, &def, old, field);
        }
        if is_list && prop == LENGTH {
            return self.set_length(&shared, id, path, field);
        }
        self.write_slot(&shared, id, prop, path, field)
    }

    #[allow(clippy::too_many_arguments)]
    fn write_accessor(
        &self,
        shared: &Rc<Shared>,
        id: NodeId,
        prop: &str,
        path: Path,
        def: &Accessor,
        old: Value,
        field: Field,
    ) -> Result<()> {
        let root = self.root_in(shared);
        let assigned = field.to_value();

        let mut manual = ManualSet::default();
        if let Some(on_set) = &def.options.on_set {
            on_set(&root, &old, &assigned, &mut manual)?;
        }
        let stored = manual.take().unwrap_or(assigned);

        {
            let mut inner = shared.inner.borrow_mut();
            if let Some(Slot::Accessor { value, .. }) =
                inner.arena.get_mut(id).and_then(|n| n.child_mut(prop))
            {
                *value = stored.clone();
            }
        }

        let after = match &def.options.after_set {
            Some(after_set) => after_set(&root, &old, &stored),
            None => Ok(()),
        };

        if !old.same_value_zero(&stored) {
            shared.publish(Change {
                target: id,
                prop: prop.to_string(),
                path,
                previous: Some(old),
                value: Some(stored),
            });
        }
        after
    }

    fn write_slot(
        &self,
        shared: &Rc<Shared>,
        id: NodeId,
        prop: &str,
        path: Path,
        field: Field,
    ) -> Result<()> {
        let mut freed = Vec::new();
        let (previous, value, changed) = {
            let mut inner = shared.inner.borrow_mut();
            let index = match inner.arena.get(id) {
                Some(node) if node.is_list() => Some(as_index(prop).ok_or_else(|| {
                    PathError::InvalidComponent {
                        component: prop.to_string(),
                        position: path.len() - 1,
                        message: "list properties must be indexes".to_string(),
                    }
                })?),
                Some(_) => None,
                None => return Err(Error::Detached),
            };

            let slot = inner.arena.import(field, &path, false)?;
            let value = inner.arena.snapshot(&slot);
            let incoming = slot.as_leaf().cloned();

            let old = match inner.arena.get_mut(id).map(|n| &mut n.body) {
                Some(Body::Map(map)) => map.insert(prop.to_string(), slot),
                Some(Body::List(list)) => {
                    let index = index.unwrap_or(list.len());
                    if index < list.len() {
                        Some(std::mem::replace(&mut list[index], slot))
                    } else {
                        list.resize(index, Slot::Value(Value::Null));
                        list.push(slot);
                        None
                    }
                }
                None => {
                    inner.arena.free(slot, &mut freed);
                    return Err(Error::Detached);
                }
            };

            let changed = match (old.as_ref().and_then(Slot::as_leaf), &incoming) {
                (Some(before), Some(after)) => !before.same_value(after),
                _ => true,
            };
            let previous = old.as_ref().map(|slot| inner.arena.snapshot(slot));
            if let Some(old) = old {
                inner.arena.free(old, &mut freed);
            }
            (previous, value, changed)
        };
        shared.evict(&freed);

        if changed {
            shared.publish(Change {
                target: id,
                prop: prop.to_string(),
                path,
                previous,
                value: Some(value),
            });
        }
        Ok(())
    }

    /// Truncate or extend a list. Always publishes.
    fn set_length(&self, shared: &Rc<Shared>, id: NodeId, path: Path, field: Field) -> Result<()> {
        let requested = field.to_value();
        let len = requested
            .as_i64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| PathError::InvalidComponent {
                component: LENGTH.to_string(),
                position: path.len() - 1,
                message: format!("invalid list length {:?}", requested),
            })?;

        let mut freed = Vec::new();
        let previous = {
            let mut inner = shared.inner.borrow_mut();
            let (previous, removed) = match inner.arena.get_mut(id).map(|n| &mut n.body) {
                Some(Body::List(list)) => {
                    let previous = list.len();
                    let removed: Vec<Slot> = if len < previous {
                        list.drain(len..).collect()
                    } else {
                        list.resize(len, Slot::Value(Value::Null));
                        Vec::new()
                    };
                    (previous, removed)
                }
                Some(Body::Map(_)) => {
                    return Err(Error::NotAList {
                        path: path.parent().unwrap_or_default(),
                    })
                }
                None => return Err(Error::Detached),
            };
            for slot in removed {
                inner.arena.free(slot, &mut freed);
            }
            previous
        };
        shared.evict(&freed);

        shared.publish(Change {
            target: id,
            prop: LENGTH.to_string(),
            path,
            previous: Some(Value::from(previous)),
            value: Some(Value::from(len)),
        });
        Ok(())
    }

    /// Remove one property. Returns `false` (and publishes nothing) when it
    /// did not exist.
    ///
    /// Removing a list element shifts the ones after it down. Every shifted
    /// index is published with its old and new value, then the vacated last
    /// index, then the new `length`.
    pub fn delete(&self, prop: &str) -> Result<bool> {
        if is_protected(prop) {
            return Err(Error::Protected {
                prop: prop.to_string(),
            });
        }

        let shared = self.shared()?;
        if is_resource_key(prop) {
            let root = shared.root();
            if root != self.inner.node {
                return shared.proxy_for(root, &self.inner.view).delete(prop);
            }
        }
        let id = self.locate(&shared)?;

        let (parent, is_list, len) = {
            let inner = shared.inner.borrow();
            let node = inner.arena.get(id).ok_or(Error::Detached)?;
            if node.frozen {
                return Err(Error::Frozen {
                    path: node.path.child(prop)?,
                });
            }
            (node.path.clone(), node.is_list(), node.len())
        };

        let mut freed = Vec::new();
        let changes = if is_list {
            let index = match as_index(prop) {
                Some(index) if index < len => index,
                _ => return Ok(false),
            };
            self.remove_element(&shared, id, &parent, index, &mut freed)?
        } else {
            let mut inner = shared.inner.borrow_mut();
            let old = match inner.arena.get_mut(id).map(|n| &mut n.body) {
                Some(Body::Map(map)) => match map.remove(prop) {
                    Some(old) => old,
                    None => return Ok(false),
                },
                _ => return Err(Error::Detached),
            };
            let previous = inner.arena.snapshot(&old);
            inner.arena.free(old, &mut freed);
            vec![Change {
                target: id,
                prop: prop.to_string(),
                path: parent.child(prop)?,
                previous: Some(previous),
                value: None,
            }]
        };
        shared.evict(&freed);

        for change in changes {
            shared.publish(change);
        }
        Ok(true)
    }

    /// Remove `index` from the list `id`, re-addressing the elements after
    /// it. Returns the changes to publish.
    fn remove_element(
        &self,
        shared: &Rc<Shared>,
        id: NodeId,
        parent: &Path,
        index: usize,
        freed: &mut Vec<NodeId>,
    ) -> Result<Vec<Change>> {
        let mut inner = shared.inner.borrow_mut();
        let before: Vec<Value> = match inner.arena.get(id).map(|n| &n.body) {
            Some(Body::List(list)) => list[index..]
                .iter()
                .map(|slot| inner.arena.snapshot(slot))
                .collect(),
            _ => return Err(Error::Detached),
        };

        let (old, shifted) = match inner.arena.get_mut(id).map(|n| &mut n.body) {
            Some(Body::List(list)) => {
                let old = list.remove(index);
                let shifted: Vec<(usize, NodeId)> = list
                    .iter()
                    .enumerate()
                    .skip(index)
                    .filter_map(|(i, slot)| match slot {
                        Slot::Node(child) => Some((i, *child)),
                        _ => None,
                    })
                    .collect();
                (old, shifted)
            }
            _ => return Err(Error::Detached),
        };
        for (i, child) in shifted {
            inner.arena.repath(child, parent.child(&i.to_string())?);
        }
        inner.arena.free(old, freed);

        let len = index + before.len();
        let mut changes = Vec::with_capacity(before.len() + 1);
        for (offset, pair) in before.windows(2).enumerate() {
            let i = (index + offset).to_string();
            changes.push(Change {
                target: id,
                path: parent.child(&i)?,
                prop: i,
                previous: Some(pair[0].clone()),
                value: Some(pair[1].clone()),
            });
        }
        let last = (len - 1).to_string();
        changes.push(Change {
            target: id,
            path: parent.child(&last)?,
            prop: last,
            previous: before.last().cloned(),
            value: None,
        });
        changes.push(Change {
            target: id,
            prop: LENGTH.to_string(),
            path: parent.child(LENGTH)?,
            previous: Some(Value::from(len)),
            value: Some(Value::from(len - 1)),
        });
        Ok(changes)
    }

    /// Append to a list. Publishes the new index, then `length`.
    pub fn push(&self, field: impl Into<Field>) -> Result<()> {
        let shared = self.shared()?;
        let id = self.locate(&shared)?;
        let (parent, frozen, len) = {
            let inner = shared.inner.borrow();
            let node = inner.arena.get(id).ok_or(Error::Detached)?;
            if !node.is_list() {
                return Err(Error::NotAList {
                    path: node.path.clone(),
                });
            }
            (node.path.clone(), node.frozen, node.len())
        };

        let prop = len.to_string();
        let path = parent.child(&prop)?;
        if frozen {
            return Err(Error::Frozen { path });
        }
        self.write_slot(&shared, id, &prop, path, field.into())?;

        shared.publish(Change {
            target: id,
            prop: LENGTH.to_string(),
            path: parent.child(LENGTH)?,
            previous: Some(Value::from(len)),
            value: Some(Value::from(len + 1)),
        });
        Ok(())
    }

    /// The keys of this container, in order. Records the container itself
    /// as read, so adding or removing keys invalidates.
    pub fn keys(&self) -> Result<Vec<String>> {
        let shared = self.shared()?;
        let id = self.locate(&shared)?;
        let (path, frozen, keys) = {
            let inner = shared.inner.borrow();
            let node = inner.arena.get(id).ok_or(Error::Detached)?;
            (node.path.clone(), node.frozen, node.keys())
        };
        if !frozen {
            self.track(&shared, &path);
        }
        Ok(keys)
    }

    /// Number of entries. Recorded like [`Proxy::keys`].
    pub fn len(&self) -> Result<usize> {
        self.keys().map(|keys| keys.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    pub fn is_list(&self) -> Result<bool> {
        let shared = self.shared()?;
        let id = self.locate(&shared)?;
        let inner = shared.inner.borrow();
        Ok(inner.arena.get(id).is_some_and(|n| n.is_list()))
    }

    /// Freeze this container and everything below it.
    pub fn freeze(&self) -> Result<()> {
        let shared = self.shared()?;
        let id = self.locate(&shared)?;
        shared.inner.borrow_mut().arena.freeze(id);
        debug_log!(shared, "froze {}", self.path());
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        let Some(shared) = self.inner.shared.upgrade() else {
            return false;
        };
        let inner = shared.inner.borrow();
        inner.arena.get(self.inner.node).is_some_and(|n| n.frozen)
    }

    fn resource_key(&self) -> Result<String> {
        let path = self.path();
        match path.resource_key() {
            Some(key) => Ok(key.to_string()),
            None => Err(Error::NotAResource { path }),
        }
    }

    /// Save the resource this handle lives under. See [`Store::save`].
    pub async fn save(&self) -> Result<Option<Value>> {
        let key = self.resource_key()?;
        self.store()?.save(&key).await
    }

    /// Reload the resource this handle lives under. See [`Store::reload`].
    pub async fn reload(&self) -> Result<Option<Value>> {
        let key = self.resource_key()?;
        self.store()?.reload(&key).await
    }

    /// Drop the cached record of the resource this handle lives under.
    pub fn refetch(&self) -> Result<bool> {
        let key = self.resource_key()?;
        Ok(self.store()?.refetch(&key))
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("node", &self.inner.node)
            .field("path", &self.path())
            .field("tracked", &matches!(self.inner.view, View::Observer(_)))
            .finish()
    }
}
