//! Field definitions: accessors, queries, actions and deferred values.
//!
//! A definition is stored in the tree in place of a plain value and changes
//! what reading (and, for accessors, writing) that property does.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::FutureExt;
use statetree_core::Value;

use crate::error::Result;
use crate::field::Field;
use crate::proxy::Proxy;
use crate::resource::{Pending, ResolveError};

type OnGet = Box<dyn Fn(&Proxy, Value) -> Result<Value>>;
type OnSet = Box<dyn Fn(&Proxy, &Value, &Value, &mut ManualSet) -> Result<()>>;
type AfterSet = Box<dyn Fn(&Proxy, &Value, &Value) -> Result<()>>;
type Derive = Box<dyn Fn(&Proxy) -> Result<Option<String>>>;
type ActionFn = Box<dyn Fn(&Proxy, &Proxy, &[Value]) -> Result<Value>>;

/// Lets an accessor's `on_set` callback store a different value than the
/// one being assigned.
#[derive(Debug, Default)]
pub struct ManualSet {
    value: Option<Value>,
}

impl ManualSet {
    /// Store `value` instead of the assigned value.
    pub fn set(&mut self, value: impl Into<Value>) {
        self.value = Some(value.into());
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn take(&mut self) -> Option<Value> {
        self.value.take()
    }
}

/// Options for an [`accessor`] field.
///
/// Every callback receives the root of the view it was invoked through, so
/// it can read or write siblings.
#[derive(Default)]
pub struct AccessorOptions {
    pub initial_value: Value,
    pub(crate) on_get: Option<OnGet>,
    pub(crate) on_set: Option<OnSet>,
    pub(crate) after_set: Option<AfterSet>,
}

impl AccessorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_value(mut self, value: impl Into<Value>) -> Self {
        self.initial_value = value.into();
        self
    }

    /// Called on every read with the stored value; its result is what the
    /// reader sees.
    pub fn on_get(mut self, f: impl Fn(&Proxy, Value) -> Result<Value> + 'static) -> Self {
        self.on_get = Some(Box::new(f));
        self
    }

    /// Called on every write with `(root, old, new, manual)`. Calling
    /// [`ManualSet::set`] replaces the value that gets stored.
    pub fn on_set(
        mut self,
        f: impl Fn(&Proxy, &Value, &Value, &mut ManualSet) -> Result<()> + 'static,
    ) -> Self {
        self.on_set = Some(Box::new(f));
        self
    }

    /// Called after every write with `(root, old, stored)`.
    pub fn after_set(mut self, f: impl Fn(&Proxy, &Value, &Value) -> Result<()> + 'static) -> Self {
        self.after_set = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for AccessorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorOptions")
            .field("initial_value", &self.initial_value)
            .field("on_get", &self.on_get.is_some())
            .field("on_set", &self.on_set.is_some())
            .field("after_set", &self.after_set.is_some())
            .finish()
    }
}

/// A property with custom get/set behavior.
#[derive(Debug)]
pub struct Accessor {
    pub(crate) options: AccessorOptions,
}

/// A property whose value is the resource named by `derive`.
pub struct Query {
    pub(crate) derive: Derive,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").finish_non_exhaustive()
    }
}

/// A function stored in the tree.
///
/// It is called with the handle of the container it lives in, the root
/// handle and its arguments.
pub struct Action {
    pub(crate) run: ActionFn,
    pub(crate) tracked: bool,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("tracked", &self.tracked)
            .finish_non_exhaustive()
    }
}

/// An [`Action`] read from the tree, bound to the view it was read through.
#[derive(Clone)]
pub struct BoundAction {
    pub(crate) action: Rc<Action>,
    pub(crate) this: Proxy,
    pub(crate) root: Proxy,
}

impl BoundAction {
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.action.run)(&self.this, &self.root, args)
    }

    /// The container the action lives in.
    pub fn this(&self) -> &Proxy {
        &self.this
    }
}

impl PartialEq for BoundAction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.action, &other.action) && self.this.ptr_eq(&other.this)
    }
}

impl fmt::Debug for BoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundAction")
            .field("action", &self.action)
            .field("this", &self.this)
            .finish()
    }
}

/// An accessor field.
///
/// ```rust
/// use statetree::{accessor, AccessorOptions, Field, Store};
///
/// let store = Store::new();
/// store
///     .replace_state(Field::map([(
///         "name",
///         accessor(
///             AccessorOptions::new()
///                 .initial_value("joel")
///                 .on_get(|_, v| Ok(v.as_str().unwrap_or_default().to_uppercase().into())),
///         ),
///     )]))
///     .unwrap();
///
/// let name = store.state().get("name").unwrap();
/// assert_eq!(name.as_str(), Some("JOEL"));
/// ```
pub fn accessor(options: AccessorOptions) -> Field {
    Field::Accessor(Rc::new(Accessor { options }))
}

/// A query field.
///
/// `derive` is called on every read with the (untracked) container holding
/// the field. A non-empty key redirects the read to that resource; `None`
/// reads as absent without fetching.
pub fn query(derive: impl Fn(&Proxy) -> Result<Option<String>> + 'static) -> Field {
    Field::Query(Rc::new(Query {
        derive: Box::new(derive),
    }))
}

/// A function field. Reading it is not recorded as a dependency.
pub fn action(run: impl Fn(&Proxy, &Proxy, &[Value]) -> Result<Value> + 'static) -> Field {
    Field::Action(Rc::new(Action {
        run: Box::new(run),
        tracked: false,
    }))
}

/// A function field whose reads are recorded like any other value.
pub fn tracked_action(
    run: impl Fn(&Proxy, &Proxy, &[Value]) -> Result<Value> + 'static,
) -> Field {
    Field::Action(Rc::new(Action {
        run: Box::new(run),
        tracked: true,
    }))
}

/// A value that is still being produced.
///
/// Reads suspend on the same handle until `future` settles, then see its
/// value (which replaces the field) or its error.
pub fn deferred(future: impl Future<Output = Result<Value, ResolveError>> + 'static) -> Field {
    let pending = Pending::new("", future.map(|result| result.map(Some)).boxed_local());
    Field::Deferred(pending)
}
