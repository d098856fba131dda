//! Observers: read passes with recorded dependencies.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use statetree_core::{
    Change, DependencyTracker, Equivalence, ListenerId, NodeId, Path, Relation,
    StructuralEquality,
};

use crate::error::{Error, Result};
use crate::proxy::{Proxy, Read, View};
use crate::store::Shared;

type InvalidateFn = Rc<dyn Fn(&Change, &Relation)>;

pub(crate) struct ObserverState {
    pub(crate) tracker: RefCell<DependencyTracker>,
    pub(crate) proxies: RefCell<HashMap<NodeId, Proxy>>,
    stale: Cell<bool>,
    callbacks: RefCell<Vec<InvalidateFn>>,
    equivalence: RefCell<Rc<dyn Equivalence>>,
}

impl ObserverState {
    fn notify(&self, change: &Change, debug: bool) {
        let equivalence = Rc::clone(&self.equivalence.borrow());
        let relation = self
            .tracker
            .borrow()
            .should_invalidate_with(change, equivalence.as_ref());
        let Some(relation) = relation else {
            return;
        };

        if debug {
            log::debug!("invalidated by {} ({:?})", change.path, relation);
        }
        self.stale.set(true);

        let callbacks = self.callbacks.borrow().clone();
        for callback in callbacks {
            callback(change, &relation);
        }
    }
}

/// A consumer that reads the tree and wants to know when what it read
/// changes.
///
/// Every read made through [`Observer::begin`] (or any handle reached from
/// it) is recorded. A published change that touches a recorded path, an
/// ancestor of one, or a descendant whose value actually differs marks the
/// observer stale and runs its invalidation callbacks.
///
/// Handles read through an observer are cached per observer, so the same
/// container yields the same handle on every pass.
pub struct Observer {
    state: Rc<ObserverState>,
    shared: Weak<Shared>,
    listener: ListenerId,
}

impl Observer {
    pub(crate) fn new(shared: &Rc<Shared>) -> Self {
        let state = Rc::new(ObserverState {
            tracker: RefCell::new(DependencyTracker::new()),
            proxies: RefCell::new(HashMap::new()),
            stale: Cell::new(false),
            callbacks: RefCell::new(Vec::new()),
            equivalence: RefCell::new(Rc::new(StructuralEquality)),
        });

        let weak_state = Rc::downgrade(&state);
        let weak_shared = Rc::downgrade(shared);
        let listener = shared.bus.borrow_mut().subscribe(Rc::new(move |change: &Change| {
            let debug = weak_shared.upgrade().is_some_and(|s| s.debug());
            if let Some(state) = weak_state.upgrade() {
                state.notify(change, debug);
            }
        }));
        shared.observers.borrow_mut().push(Rc::downgrade(&state));

        Self {
            state,
            shared: Rc::downgrade(shared),
            listener,
        }
    }

    fn shared(&self) -> Result<Rc<Shared>> {
        self.shared.upgrade().ok_or(Error::Detached)
    }

    /// Start a read pass: forget the previous pass's dependencies and return
    /// the tracked root.
    pub fn begin(&self) -> Result<Proxy> {
        let shared = self.shared()?;
        self.state.tracker.borrow_mut().reset();
        self.state.stale.set(false);
        debug_log!(shared, "observer pass started");
        self.state()
    }

    /// The tracked root, without starting a new pass.
    pub fn state(&self) -> Result<Proxy> {
        let shared = self.shared()?;
        let root = shared.root();
        Ok(shared.proxy_for(root, &self.view()))
    }

    /// Read `path` through the tracked root.
    ///
    /// Unlike [`Store::slice`](crate::Store::slice) a leaf is not an error:
    /// it is read through its parent and returned as a value.
    pub fn slice(&self, path: &str) -> Result<Read> {
        self.state()?.at(path)
    }

    /// Run `callback` whenever a change invalidates this observer.
    pub fn on_invalidate(&self, callback: impl Fn(&Change, &Relation) + 'static) {
        self.state.callbacks.borrow_mut().push(Rc::new(callback));
    }

    /// Whether a change invalidated this observer since its last pass.
    pub fn is_stale(&self) -> bool {
        self.state.stale.get()
    }

    /// The paths read during the current pass, in first-read order.
    pub fn paths(&self) -> Vec<Path> {
        self.state.tracker.borrow().paths().to_vec()
    }

    /// Compare watched descendants with `equivalence` instead of the
    /// default structural equality.
    pub fn set_equivalence(&self, equivalence: impl Equivalence + 'static) {
        *self.state.equivalence.borrow_mut() = Rc::new(equivalence);
    }

    pub fn with_equivalence(self, equivalence: impl Equivalence + 'static) -> Self {
        self.set_equivalence(equivalence);
        self
    }

    fn view(&self) -> View {
        View::Observer(Rc::downgrade(&self.state))
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.bus.borrow_mut().unsubscribe(self.listener);
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("paths", &self.state.tracker.borrow().paths())
            .field("stale", &self.state.stale.get())
            .finish()
    }
}
