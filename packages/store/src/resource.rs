//! Async resources: the resolver seam, pending handles and per-key records.
//!
//! A resource key (`/users/1`) names data that lives behind a [`Resolver`].
//! The first read of a key starts exactly one request and stores a
//! [`Pending`] handle for it. Every read until the request settles fails with
//! [`Error::Suspended`](crate::Error::Suspended) carrying a clone of that same
//! handle; afterwards reads see the response (written into the tree under
//! the key) or the cached error.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use statetree_core::Value;

/// Outcome of resolving a resource. `None` means "no content".
pub type ResolveResult = Result<Option<Value>, ResolveError>;

/// The future returned by a [`Resolver`].
pub type ResolveFuture = LocalBoxFuture<'static, ResolveResult>;

/// Per-resource response transform, applied once to every non-empty response.
pub type Transform = Rc<dyn Fn(Value) -> Value>;

/// Request method passed to the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOptions {
    pub method: Method,
    /// Request body, if any.
    pub body: Option<Value>,
}

impl ResolveOptions {
    pub fn new(method: Method) -> Self {
        Self { method, body: None }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Resolves resource keys to values.
///
/// Any `Fn(&str, &ResolveOptions) -> impl Future<Output = ResolveResult>`
/// closure is a resolver.
pub trait Resolver {
    fn resolve(&self, key: &str, options: &ResolveOptions) -> ResolveFuture;
}

impl<F, Fut> Resolver for F
where
    F: Fn(&str, &ResolveOptions) -> Fut,
    Fut: Future<Output = ResolveResult> + 'static,
{
    fn resolve(&self, key: &str, options: &ResolveOptions) -> ResolveFuture {
        self(key, options).boxed_local()
    }
}

/// A shared resolver error.
///
/// Clones share the original error object, so the error cached for a
/// resource is the very same instance on every read ([`ResolveError::ptr_eq`]).
#[derive(Clone)]
pub struct ResolveError(Rc<dyn std::error::Error>);

impl ResolveError {
    pub fn new<E: std::error::Error + 'static>(error: E) -> Self {
        Self(Rc::new(error))
    }

    /// An error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Whether both errors are the same instance.
    pub fn ptr_eq(&self, other: &ResolveError) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.0) as *const (),
            Rc::as_ptr(&other.0) as *const (),
        )
    }

    /// Downcast to the original error type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

/// A single in-flight resolution shared by every reader.
///
/// Awaiting a `Pending` drives the underlying request; all clones observe
/// the same outcome.
#[derive(Clone)]
pub struct Pending {
    key: Rc<str>,
    inner: Shared<ResolveFuture>,
}

impl Pending {
    pub(crate) fn new(key: &str, future: ResolveFuture) -> Self {
        Self {
            key: Rc::from(key),
            inner: future.shared(),
        }
    }

    /// The key being resolved.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether both handles refer to the same request.
    pub fn ptr_eq(&self, other: &Pending) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    /// The outcome, once settled.
    pub fn peek(&self) -> Option<&ResolveResult> {
        self.inner.peek()
    }

    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }
}

impl Future for Pending {
    type Output = ResolveResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().inner).poll(cx)
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("key", &self.key)
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Per-resource configuration.
#[derive(Clone, Default)]
pub struct ResourceOptions {
    pub(crate) resolver: Option<Rc<dyn Resolver>>,
    pub(crate) transform: Option<Transform>,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve this resource with `resolver` instead of the store's.
    pub fn resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Some(Rc::new(resolver));
        self
    }

    /// Normalize every non-empty response before it is cached.
    pub fn transform(mut self, transform: impl Fn(Value) -> Value + 'static) -> Self {
        self.transform = Some(Rc::new(transform));
        self
    }
}

impl fmt::Debug for ResourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("resolver", &self.resolver.is_some())
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Observable state of a resource record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Pending,
    Success,
    Error,
}

/// The cache entry for one resource key.
#[derive(Debug, Clone)]
pub(crate) struct Record {
    pub(crate) pending: Pending,
    /// The successful response has been written into the tree; reads go
    /// straight to the tree from now on.
    pub(crate) committed: bool,
}

impl Record {
    pub(crate) fn new(pending: Pending) -> Self {
        Self {
            pending,
            committed: false,
        }
    }

    pub(crate) fn status(&self) -> ResourceStatus {
        match self.pending.peek() {
            None => ResourceStatus::Pending,
            Some(Ok(_)) => ResourceStatus::Success,
            Some(Err(_)) => ResourceStatus::Error,
        }
    }
}

/// Build the request for `key`: the resolver's future, with an empty or
/// `null` response normalized to `None` and everything else passed through
/// `transform`.
pub(crate) fn request(
    resolver: Option<Rc<dyn Resolver>>,
    transform: Option<Transform>,
    key: &str,
    options: &ResolveOptions,
) -> ResolveFuture {
    let response = match resolver {
        Some(resolver) => resolver.resolve(key, options),
        None => {
            let message = format!("no resolver configured for '{}'", key);
            async move { Err::<Option<Value>, _>(ResolveError::msg(message)) }.boxed_local()
        }
    };

    async move {
        Ok::<_, ResolveError>(match response.await? {
            None | Some(Value::Null) => None,
            Some(value) => Some(match &transform {
                Some(transform) => transform(value),
                None => value,
            }),
        })
    }
    .boxed_local()
}
