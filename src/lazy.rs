//! Lazy memoization and deferred resolution handles
//!
//! [`LazyValue`] runs a zero-argument producer at most once. The handles
//! returned by [`Container::resolve_lazy`] and friends are built on it.

use crate::factory::Registration;
use crate::{Container, DiError, Injectable, Lifetime, Result, Token};
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[cfg(feature = "logging")]
use tracing::trace;

/// What a producer hands back: a finished value or a computation to await
pub enum Produced<T> {
    Ready(Result<Arc<T>>),
    Pending(BoxFuture<'static, Result<Arc<T>>>),
}

type ProducerFn<T> = Box<dyn Fn() -> Produced<T> + Send + Sync>;

/// At-most-once memoizer over a sync or async producer.
///
/// Concurrent async callers share the in-flight computation. Failures are
/// not cached: the next access runs the producer again.
///
/// # Examples
///
/// ```rust
/// use ioc_registry::LazyValue;
/// use std::sync::Arc;
///
/// let value = LazyValue::from_sync("answer", || Ok(42_u32));
/// let a = value.get_sync().unwrap();
/// let b = value.get_sync().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let pending = LazyValue::from_async("later", || async { Ok(1_u32) });
/// assert!(pending.get_sync().is_err());
/// ```
pub struct LazyValue<T> {
    label: &'static str,
    producer: ProducerFn<T>,
    cell: OnceCell<Arc<T>>,
}

impl<T: Injectable> LazyValue<T> {
    /// Wrap a raw producer
    pub fn new<F>(label: &'static str, producer: F) -> Self
    where
        F: Fn() -> Produced<T> + Send + Sync + 'static,
    {
        Self {
            label,
            producer: Box::new(producer),
            cell: OnceCell::new(),
        }
    }

    /// Wrap a synchronous producer
    pub fn from_sync<F>(label: &'static str, producer: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self::new(label, move || Produced::Ready(producer().map(Arc::new)))
    }

    /// Wrap an asynchronous producer
    pub fn from_async<F, Fut>(label: &'static str, producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::new(label, move || {
            let fut = producer();
            Produced::Pending(Box::pin(async move { fut.await.map(Arc::new) }))
        })
    }

    /// The memoized value, producing it synchronously on first access.
    ///
    /// Fails with `SyncOnAsyncProducer` if the producer hands back a
    /// computation; nothing blocks waiting for it.
    pub fn get_sync(&self) -> Result<Arc<T>> {
        if let Some(value) = self.cell.get() {
            return Ok(Arc::clone(value));
        }

        let value = self.run_sync()?;
        // a concurrent initializer may have won; prefer its value
        let _ = self.cell.set(Arc::clone(&value));
        Ok(self.cell.get().cloned().unwrap_or(value))
    }

    /// The memoized value, awaiting the producer on first access.
    pub async fn get(&self) -> Result<Arc<T>> {
        self.cell
            .get_or_try_init(|| self.run())
            .await
            .map(Arc::clone)
    }

    /// Run the producer without touching the memo, synchronously
    pub fn run_sync(&self) -> Result<Arc<T>> {
        match (self.producer)() {
            Produced::Ready(result) => result,
            Produced::Pending(_) => Err(DiError::SyncOnAsyncProducer { label: self.label }),
        }
    }

    /// Run the producer without touching the memo
    pub async fn run(&self) -> Result<Arc<T>> {
        #[cfg(feature = "logging")]
        trace!(target: "ioc_registry", label = self.label, "Running lazy producer");

        match (self.producer)() {
            Produced::Ready(result) => result,
            Produced::Pending(fut) => fut.await,
        }
    }

    /// The memoized value, if produced already
    #[inline]
    pub fn peek(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    /// Whether a value has been memoized
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// Diagnostic label
    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<T> fmt::Debug for LazyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("label", &self.label)
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}

// =============================================================================
// Container-backed handles
// =============================================================================

/// Shared state of a deferred resolution
struct Deferred<T> {
    lifetime: Lifetime,
    memo: LazyValue<T>,
}

impl<T: Injectable> Deferred<T> {
    fn new(container: &Container, token: Token<T>, name: Option<Arc<str>>, sampled: &Registration) -> Arc<Self> {
        let container = container.clone();
        let asynchronous = sampled.is_async();

        let memo = LazyValue::new(token.description(), move || {
            if asynchronous {
                let container = container.clone();
                let name = name.clone();
                Produced::Pending(Box::pin(async move {
                    container.resolve_async_with(&token, name.as_deref()).await
                }))
            } else {
                Produced::Ready(container.resolve_with(&token, name.as_deref()))
            }
        });

        Arc::new(Self {
            lifetime: sampled.lifetime(),
            memo,
        })
    }

    fn get_sync(&self) -> Result<Arc<T>> {
        if self.lifetime.is_cached() {
            self.memo.get_sync()
        } else {
            self.memo.run_sync()
        }
    }

    async fn get(&self) -> Result<Arc<T>> {
        if self.lifetime.is_cached() {
            self.memo.get().await
        } else {
            self.memo.run().await
        }
    }
}

/// A deferred synchronous accessor.
///
/// Non-transient values are produced once and memoized in the handle
/// (clones share the memo); transient ones are re-resolved on every call.
///
/// # Examples
///
/// ```rust
/// use ioc_registry::{token, Container};
///
/// let config = token::<String>("lazy-doc-config");
/// let container = Container::new();
/// container.singleton(&config, |_| Ok("loaded".to_string()));
///
/// let lazy = container.resolve_lazy(&config).unwrap();
/// assert_eq!(*lazy.get().unwrap(), "loaded");
/// ```
pub struct Lazy<T> {
    deferred: Arc<Deferred<T>>,
}

impl<T: Injectable> Lazy<T> {
    pub(crate) fn new(
        container: &Container,
        token: Token<T>,
        name: Option<Arc<str>>,
        sampled: &Registration,
    ) -> Self {
        Self {
            deferred: Deferred::new(container, token, name, sampled),
        }
    }

    /// Resolve (first call) or return the memoized value.
    ///
    /// Fails with `SyncOnAsyncProducer` when the target registration is async.
    #[inline]
    pub fn get(&self) -> Result<Arc<T>> {
        self.deferred.get_sync()
    }

    /// Like `get`, but drives async registrations too
    #[inline]
    pub async fn get_async(&self) -> Result<Arc<T>> {
        self.deferred.get().await
    }

    /// Lifetime of the registration sampled at creation
    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.deferred.lifetime
    }

    /// Whether a value has been memoized
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.deferred.memo.is_initialized()
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            deferred: Arc::clone(&self.deferred),
        }
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("token", &self.deferred.memo.label)
            .field("lifetime", &self.deferred.lifetime)
            .finish()
    }
}

/// A deferred asynchronous accessor.
///
/// Concurrent first calls share one in-flight resolution.
pub struct AsyncLazy<T> {
    deferred: Arc<Deferred<T>>,
}

impl<T: Injectable> AsyncLazy<T> {
    pub(crate) fn new(
        container: &Container,
        token: Token<T>,
        name: Option<Arc<str>>,
        sampled: &Registration,
    ) -> Self {
        Self {
            deferred: Deferred::new(container, token, name, sampled),
        }
    }

    /// Resolve (first call) or return the memoized value
    #[inline]
    pub async fn get(&self) -> Result<Arc<T>> {
        self.deferred.get().await
    }

    /// Lifetime of the registration sampled at creation
    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.deferred.lifetime
    }
}

impl<T> Clone for AsyncLazy<T> {
    fn clone(&self) -> Self {
        Self {
            deferred: Arc::clone(&self.deferred),
        }
    }
}

impl<T> fmt::Debug for AsyncLazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncLazy")
            .field("token", &self.deferred.memo.label)
            .field("lifetime", &self.deferred.lifetime)
            .finish()
    }
}

/// A field whose value is resolved on first read.
///
/// The struct holding it is constructed without touching the dependency.
///
/// ```rust
/// use ioc_registry::{token, Container, Inject};
///
/// struct Mailer { host: String }
/// struct Signup { mailer: Inject<Mailer> }
///
/// let mailer = token::<Mailer>("inject-doc-mailer");
/// let container = Container::new();
/// container.singleton(&mailer, |_| Ok(Mailer { host: "smtp".into() }));
///
/// let signup = Signup { mailer: container.inject_lazy(&mailer).unwrap() };
/// assert_eq!(signup.mailer.get().unwrap().host, "smtp");
/// ```
pub struct Inject<T> {
    lazy: Lazy<T>,
}

impl<T: Injectable> Inject<T> {
    /// Read the field, resolving on first access
    #[inline]
    pub fn get(&self) -> Result<Arc<T>> {
        self.lazy.get()
    }

    /// Whether the field has been read and memoized
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.lazy.is_resolved()
    }
}

impl<T> From<Lazy<T>> for Inject<T> {
    fn from(lazy: Lazy<T>) -> Self {
        Self { lazy }
    }
}

impl<T> Clone for Inject<T> {
    fn clone(&self) -> Self {
        Self {
            lazy: self.lazy.clone(),
        }
    }
}

impl<T> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Inject").field(&self.lazy).finish()
    }
}
