//! The store: owner of the tree, its handles and its resources.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use statetree_core::{Change, ChangeBus, ListenerId, NodeId, Path, Value};

use crate::arena::{Arena, Body};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::merge;
use crate::observer::{Observer, ObserverState};
use crate::proxy::{Proxy, Read, View};
use crate::resource::{
    self, Method, Pending, Record, ResolveFuture, ResolveOptions, Resolver, ResourceOptions,
    ResourceStatus, Transform,
};

pub(crate) struct Inner {
    pub(crate) arena: Arena,
    pub(crate) resources: HashMap<String, Record>,
    pub(crate) options: HashMap<String, ResourceOptions>,
    pub(crate) resolver: Option<Rc<dyn Resolver>>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            resources: HashMap::new(),
            options: HashMap::new(),
            resolver: None,
        }
    }
}

impl Inner {
    /// The resolver and transform registered for `key`.
    fn resolution(&self, key: &str) -> (Option<Rc<dyn Resolver>>, Option<Transform>) {
        let registered = self.options.get(key);
        let resolver = registered
            .and_then(|o| o.resolver.clone())
            .or_else(|| self.resolver.clone());
        let transform = registered.and_then(|o| o.transform.clone());
        (resolver, transform)
    }
}

/// State shared by a store and every handle into it.
///
/// Borrows of `inner` are never held while user callbacks or listeners run.
pub(crate) struct Shared {
    pub(crate) inner: RefCell<Inner>,
    pub(crate) proxies: RefCell<HashMap<NodeId, Proxy>>,
    pub(crate) bus: RefCell<ChangeBus>,
    /// Live observers, whose handle caches are evicted along with ours.
    pub(crate) observers: RefCell<Vec<Weak<ObserverState>>>,
    pub(crate) config: Cell<StoreConfig>,
}

impl Shared {
    pub(crate) fn debug(&self) -> bool {
        self.config.get().debug
    }

    pub(crate) fn root(&self) -> NodeId {
        self.inner.borrow().arena.root()
    }

    /// The handle for `id` in `view`, created on first use.
    pub(crate) fn proxy_for(self: &Rc<Self>, id: NodeId, view: &View) -> Proxy {
        let make = || {
            let path = self
                .inner
                .borrow()
                .arena
                .get(id)
                .map(|n| n.path.clone())
                .unwrap_or_default();
            Proxy::new(Rc::downgrade(self), id, view.clone(), path)
        };

        match view {
            View::Store => self
                .proxies
                .borrow_mut()
                .entry(id)
                .or_insert_with(make)
                .clone(),
            View::Observer(observer) => match observer.upgrade() {
                Some(observer) => observer
                    .proxies
                    .borrow_mut()
                    .entry(id)
                    .or_insert_with(make)
                    .clone(),
                None => make(),
            },
        }
    }

    /// Forget the handles of removed nodes, in every view.
    pub(crate) fn evict(&self, freed: &[NodeId]) {
        if freed.is_empty() {
            return;
        }
        let mut proxies = self.proxies.borrow_mut();
        for id in freed {
            proxies.remove(id);
        }
        self.observers
            .borrow_mut()
            .retain(|observer| match observer.upgrade() {
                Some(observer) => {
                    let mut proxies = observer.proxies.borrow_mut();
                    for id in freed {
                        proxies.remove(id);
                    }
                    true
                }
                None => false,
            });
    }

    pub(crate) fn publish(&self, change: Change) {
        debug_log!(
            self,
            "mutated {}: {:?} -> {:?}",
            change.path,
            change.previous,
            change.value
        );
        let listeners = self.bus.borrow().listeners();
        for listener in listeners {
            listener(&change);
        }
    }

    /// Make sure the response for `key` is in the tree.
    ///
    /// Starts the request on first use, suspends while it is in flight,
    /// returns the cached error after a failure, and writes a fresh
    /// response into the tree the first time it is seen.
    pub(crate) fn ensure_resource(self: &Rc<Self>, key: &str) -> Result<()> {
        let record = self.inner.borrow().resources.get(key).cloned();
        let Some(record) = record else {
            return Err(Error::Suspended(self.start_fetch(key)));
        };
        if record.committed {
            return Ok(());
        }
        match record.pending.peek() {
            None => Err(Error::Suspended(record.pending.clone())),
            Some(Err(error)) => {
                debug_log!(self, "fetch of {} failed: {}", key, error);
                Err(Error::Fetch(error.clone()))
            }
            Some(Ok(response)) => {
                let response = response.clone();
                self.commit_resource(key, response)
            }
        }
    }

    /// Start a request for `key`. The resolver runs with no borrow held.
    pub(crate) fn request(&self, key: &str, options: &ResolveOptions) -> ResolveFuture {
        let (resolver, transform) = self.inner.borrow().resolution(key);
        resource::request(resolver, transform, key, options)
    }

    fn start_fetch(&self, key: &str) -> Pending {
        let request = self.request(key, &ResolveOptions::default());
        let mut inner = self.inner.borrow_mut();
        let record = inner
            .resources
            .entry(key.to_string())
            .or_insert_with(|| Record::new(Pending::new(key, request)));
        debug_log!(self, "fetching {}", key);
        record.pending.clone()
    }

    /// Write a settled response under `key` at the root.
    ///
    /// The record counts as committed while the write runs, so listeners
    /// reading the key see the tree; a failed write leaves it uncommitted
    /// and the next read tries again.
    fn commit_resource(self: &Rc<Self>, key: &str, response: Option<Value>) -> Result<()> {
        self.mark_committed(key, true);
        let result = self.write_resource(key, response);
        if result.is_err() {
            self.mark_committed(key, false);
        }
        result
    }

    fn mark_committed(&self, key: &str, committed: bool) {
        if let Some(record) = self.inner.borrow_mut().resources.get_mut(key) {
            record.committed = committed;
        }
    }

    /// Filling an empty slot is silent; replacing data that is already
    /// there goes through the ordinary write path and publishes.
    fn write_resource(self: &Rc<Self>, key: &str, response: Option<Value>) -> Result<()> {
        let root = self.root();
        let field = Field::Value(response.unwrap_or(Value::Null));

        let exists = {
            let inner = self.inner.borrow();
            match inner.arena.get(root) {
                Some(node) if node.frozen => {
                    return Err(Error::Frozen {
                        path: Path::resource(key)?,
                    })
                }
                Some(node) => node.child(key).is_some(),
                None => return Err(Error::Detached),
            }
        };
        if exists {
            return self.proxy_for(root, &View::Store).set(key, field);
        }

        let path = Path::resource(key)?;
        let mut inner = self.inner.borrow_mut();
        let slot = inner.arena.import(field, &path, false)?;
        match inner.arena.get_mut(root).map(|n| &mut n.body) {
            Some(Body::Map(map)) => {
                map.insert(key.to_string(), slot);
                debug_log!(self, "resolved {}", key);
                Ok(())
            }
            _ => {
                inner.arena.free(slot, &mut Vec::new());
                Err(Error::NotAContainer { path: Path::root() })
            }
        }
    }

    /// Read the resource `key` through `view`.
    pub(crate) fn read_resource(self: &Rc<Self>, key: &str, view: &View) -> Result<Read> {
        Path::resource(key)?;
        self.ensure_resource(key)?;
        let root = self.root();
        self.proxy_for(root, view).read_child(self, root, key)
    }
}

/// A reactive state tree.
///
/// Cloning a `Store` yields another handle to the same tree.
///
/// ```rust
/// use statetree::{Field, Store};
///
/// let store = Store::new();
/// store.replace_state(Field::map([("count", 0)])).unwrap();
///
/// let state = store.state();
/// state.set("count", 1).unwrap();
/// assert_eq!(state.get("count").unwrap().as_i64(), Some(1));
/// ```
#[derive(Clone)]
pub struct Store {
    pub(crate) shared: Rc<Shared>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                inner: RefCell::new(Inner::default()),
                proxies: RefCell::new(HashMap::new()),
                bus: RefCell::new(ChangeBus::new()),
                observers: RefCell::new(Vec::new()),
                config: Cell::new(config),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Rc<Shared>) -> Self {
        Self { shared }
    }

    pub fn config(&self) -> StoreConfig {
        self.shared.config.get()
    }

    pub fn set_debug(&self, debug: bool) {
        self.shared.config.set(self.config().with_debug(debug));
    }

    /// The untracked handle on the root container.
    pub fn state(&self) -> Proxy {
        let root = self.shared.root();
        self.shared.proxy_for(root, &View::Store)
    }

    /// Replace the whole tree. Publishes nothing.
    pub fn replace_state(&self, field: impl Into<Field>) -> Result<()> {
        let field = field.into();
        if !field.is_container() {
            return Err(Error::NotAContainer { path: Path::root() });
        }
        let freed = self.shared.inner.borrow_mut().arena.replace_root(field)?;
        self.shared.evict(&freed);
        self.shared.proxies.borrow_mut().clear();
        Ok(())
    }

    /// A plain copy of the whole tree.
    pub fn raw_state(&self) -> Value {
        let inner = self.shared.inner.borrow();
        let root = inner.arena.root();
        inner.arena.snapshot_node(root)
    }

    /// Recursively merge a map into the tree.
    ///
    /// Maps merge into existing maps; everything else (arrays included)
    /// replaces what is there. Each assignment publishes.
    pub fn merge(&self, field: impl Into<Field>) -> Result<()> {
        merge::merge(&self.shared, field.into())
    }

    /// Read a dotted path from the root.
    pub fn get_path(&self, path: &str) -> Result<Read> {
        self.state().at(path)
    }

    /// Write a dotted path from the root, creating missing maps on the way.
    pub fn set_path(&self, path: &str, field: impl Into<Field>) -> Result<()> {
        let parsed = Path::parse(path)?;
        let Some((last, parents)) = parsed.components().split_last() else {
            return self.replace_state(field);
        };

        let mut current = self.state();
        for (depth, component) in parents.iter().enumerate() {
            current = match current.get(component)? {
                Read::Node(next) => next,
                Read::Absent => {
                    current.set(component, Field::empty_map())?;
                    current
                        .get(component)?
                        .into_node()
                        .ok_or_else(|| Error::NotAContainer {
                            path: parsed.slice(0, depth + 1),
                        })?
                }
                _ => {
                    return Err(Error::NotAContainer {
                        path: parsed.slice(0, depth + 1),
                    })
                }
            };
        }
        current.set(last, field)
    }

    /// The container at `path`. Anything else is an error.
    pub fn slice(&self, path: &str) -> Result<Proxy> {
        match self.state().at(path)? {
            Read::Node(proxy) => Ok(proxy),
            _ => Err(Error::UnsupportedSlice {
                path: Path::parse(path)?,
            }),
        }
    }

    /// Call `listener` with every published change.
    pub fn listen(&self, listener: impl Fn(&Change) + 'static) -> Listener {
        let id = self.shared.bus.borrow_mut().subscribe(Rc::new(listener));
        Listener {
            shared: Rc::downgrade(&self.shared),
            id,
        }
    }

    pub fn set_resolver(&self, resolver: impl Resolver + 'static) {
        self.shared.inner.borrow_mut().resolver = Some(Rc::new(resolver));
    }

    /// Configure one resource key.
    pub fn register_resource(&self, key: &str, options: ResourceOptions) -> Result<()> {
        Path::resource(key)?;
        self.shared
            .inner
            .borrow_mut()
            .options
            .insert(key.to_string(), options);
        Ok(())
    }

    pub fn resource_status(&self, key: &str) -> Option<ResourceStatus> {
        self.shared
            .inner
            .borrow()
            .resources
            .get(key)
            .map(Record::status)
    }

    /// Resolve `key` without touching the cache or the tree.
    pub fn fetch(&self, key: &str, options: ResolveOptions) -> ResolveFuture {
        debug_log!(self.shared, "{} {}", options.method, key);
        self.shared.request(key, &options)
    }

    /// Drop the cached record for `key`; the next read fetches again.
    pub fn refetch(&self, key: &str) -> bool {
        debug_log!(self.shared, "refetch {}", key);
        self.shared
            .inner
            .borrow_mut()
            .resources
            .remove(key)
            .is_some()
    }

    /// Resolve `key` now and write a non-empty response into the tree.
    pub async fn reload(&self, key: &str) -> Result<Option<Value>> {
        Path::resource(key)?;
        let response = self.fetch(key, ResolveOptions::default()).await?;
        if let Some(value) = &response {
            self.state().set(key, value.clone())?;
        }
        Ok(response)
    }

    /// Send the current value under `key` as a `PATCH` and write a
    /// non-empty response back. A failure leaves the tree untouched.
    pub async fn save(&self, key: &str) -> Result<Option<Value>> {
        Path::resource(key)?;
        let body = {
            let inner = self.shared.inner.borrow();
            let root = inner.arena.root();
            inner
                .arena
                .get(root)
                .and_then(|n| n.child(key))
                .map(|slot| inner.arena.snapshot(slot))
                .unwrap_or_default()
        };

        let options = ResolveOptions::new(Method::Patch).with_body(body);
        let response = self.fetch(key, options).await?;
        if let Some(value) = &response {
            self.state().set(key, value.clone())?;
        }
        Ok(response)
    }

    /// Wait for every in-flight resource request to settle.
    pub async fn settled(&self) {
        loop {
            let pending: Vec<Pending> = self
                .shared
                .inner
                .borrow()
                .resources
                .values()
                .filter(|r| !r.pending.is_settled())
                .map(|r| r.pending.clone())
                .collect();
            if pending.is_empty() {
                return;
            }
            futures::future::join_all(pending).await;
        }
    }

    /// Wipe the tree, every cache, every listener and the resolver.
    pub fn reset(&self) {
        let freed = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.resources.clear();
            inner.options.clear();
            inner.resolver = None;
            inner.arena.clear()
        };
        self.shared.evict(&freed);
        self.shared.proxies.borrow_mut().clear();
        self.shared.bus.borrow_mut().clear();
    }

    /// Freeze the container at `path` and everything below it.
    ///
    /// Leaves are already immutable outside the write path, so freezing one
    /// is a no-op.
    pub fn freeze(&self, path: &str) -> Result<()> {
        match self.state().at(path)? {
            Read::Node(proxy) => proxy.freeze(),
            _ => Ok(()),
        }
    }

    /// A new observer with its own dependency set.
    pub fn observe(&self) -> Observer {
        Observer::new(&self.shared)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.borrow();
        f.debug_struct("Store")
            .field("nodes", &inner.arena.len())
            .field("resources", &inner.resources.len())
            .field("listeners", &self.shared.bus.borrow().len())
            .field("config", &self.shared.config.get())
            .finish()
    }
}

/// A subscription made with [`Store::listen`].
#[derive(Debug)]
pub struct Listener {
    shared: Weak<Shared>,
    id: ListenerId,
}

impl Listener {
    /// Stop receiving changes. Returns whether the listener was still
    /// subscribed.
    pub fn unlisten(self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.bus.borrow_mut().unsubscribe(self.id),
            None => false,
        }
    }
}
