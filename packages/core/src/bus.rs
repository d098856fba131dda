//! Synchronous, ordered fan-out of [`Change`] records.

use std::fmt;
use std::rc::Rc;

use crate::Change;

/// A subscriber callback.
pub type ListenerFn = Rc<dyn Fn(&Change)>;

/// Handle returned by [`ChangeBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An order-preserving set of listeners.
///
/// Subscribing the same callback (the same `Rc`) twice keeps the first
/// registration and returns its id.
#[derive(Default)]
pub struct ChangeBus {
    listeners: Vec<(ListenerId, ListenerFn)>,
    next_id: u64,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: ListenerFn) -> ListenerId {
        if let Some((id, _)) = self
            .listeners
            .iter()
            .find(|(_, existing)| same_listener(existing, &listener))
        {
            return *id;
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns whether it was subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// The current listeners, in subscription order.
    ///
    /// Callers that hold the bus behind a `RefCell` take this snapshot and
    /// release the borrow before invoking anything, so listeners may
    /// subscribe or unsubscribe while a change is being delivered.
    pub fn listeners(&self) -> Vec<ListenerFn> {
        self.listeners.iter().map(|(_, l)| Rc::clone(l)).collect()
    }

    /// Deliver `change` to every listener, in subscription order.
    pub fn publish(&self, change: &Change) {
        for (_, listener) in &self.listeners {
            listener(change);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn same_listener(a: &ListenerFn, b: &ListenerFn) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}
