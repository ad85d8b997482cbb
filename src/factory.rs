//! Registrations and their type-erased producers
//!
//! A [`Registration`] binds one producer (sync or async) to a token, together
//! with its lifetime, variant name, condition, cached instance slot and the
//! re-entrancy flag used for cycle detection.

use crate::token::Symbol;
use crate::{Condition, Container, DiError, Lifetime, Result};
use futures_util::future::BoxFuture;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::trace;

/// Type-erased instance
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased synchronous factory
pub(crate) type SyncFactoryFn = Arc<dyn Fn(&Container) -> Result<AnyArc> + Send + Sync>;

/// Type-erased asynchronous factory
pub(crate) type AsyncFactoryFn =
    Arc<dyn Fn(Container) -> BoxFuture<'static, Result<AnyArc>> + Send + Sync>;

/// Synthetic variant qualifier shared by unnamed registrations
pub const DEFAULT_NAME: &str = "default";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Exactly one producer per registration
pub(crate) enum Producer {
    Sync(SyncFactoryFn),
    Async(AsyncFactoryFn),
}

/// One factory binding for a token.
///
/// Policies receive registrations as candidates and read them through the
/// accessors; the instance slot and re-entrancy flag are managed by the
/// container.
pub struct Registration {
    symbol: Symbol,
    lifetime: Lifetime,
    producer: Producer,
    name: Option<Arc<str>>,
    condition: Option<Condition>,
    sequence: u64,
    /// Set at most once for non-transient lifetimes
    instance: OnceCell<AnyArc>,
    /// True only while the factory is executing
    resolving: AtomicBool,
}

impl Registration {
    pub(crate) fn new(
        symbol: Symbol,
        lifetime: Lifetime,
        producer: Producer,
        name: Option<Arc<str>>,
        condition: Option<Condition>,
    ) -> Self {
        Self {
            symbol,
            lifetime,
            producer,
            name,
            condition,
            sequence: SEQUENCE.fetch_add(1, Ordering::Relaxed),
            instance: OnceCell::new(),
            resolving: AtomicBool::new(false),
        }
    }

    /// Wrap a typed synchronous factory
    pub(crate) fn sync_producer<T, F>(factory: F) -> Producer
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        Producer::Sync(Arc::new(move |c: &Container| {
            factory(c).map(|v| Arc::new(v) as AnyArc)
        }))
    }

    /// Wrap a typed asynchronous factory
    pub(crate) fn async_producer<T, F, Fut>(factory: F) -> Producer
    where
        T: Send + Sync + 'static,
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Producer::Async(Arc::new(move |c: Container| {
            let fut = factory(c);
            Box::pin(async move { fut.await.map(|v| Arc::new(v) as AnyArc) })
        }))
    }

    /// The token this registration belongs to
    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Caching behavior
    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// The explicit variant name, if any
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The variant name with unnamed registrations mapped to `default`
    #[inline]
    pub fn qualifier(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// The gating condition, if any
    #[inline]
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Whether the producer is asynchronous
    #[inline]
    pub fn is_async(&self) -> bool {
        matches!(self.producer, Producer::Async(_))
    }

    /// Whether the factory is currently executing
    #[inline]
    pub fn is_resolving(&self) -> bool {
        self.resolving.load(Ordering::Acquire)
    }

    /// Whether an instance has been cached
    #[inline]
    pub fn is_cached(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Global registration order, usable as a tie-breaker by custom policies
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    fn cached(&self) -> Option<AnyArc> {
        if self.lifetime.is_cached() {
            self.instance.get().cloned()
        } else {
            None
        }
    }

    #[inline]
    fn store(&self, value: AnyArc) -> AnyArc {
        if self.lifetime.is_cached() {
            Arc::clone(self.instance.get_or_init(|| value))
        } else {
            value
        }
    }

    /// Produce (or return the cached) instance through the synchronous factory.
    ///
    /// `owner` is the container holding this registration.
    pub(crate) fn produce(self: &Arc<Self>, owner: &Container) -> Result<AnyArc> {
        let factory = match &self.producer {
            Producer::Sync(f) => f,
            Producer::Async(_) => {
                return Err(DiError::WrongResolutionMode {
                    token: self.symbol.description(),
                });
            }
        };

        if let Some(instance) = self.cached() {
            #[cfg(feature = "logging")]
            trace!(
                target: "ioc_registry",
                token = self.symbol.description(),
                name = self.qualifier(),
                "Returning cached instance"
            );
            return Ok(instance);
        }

        let _guard = ResolvingGuard::acquire(self)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "ioc_registry",
            token = self.symbol.description(),
            name = self.qualifier(),
            lifetime = self.lifetime.as_str(),
            depth = owner.depth(),
            "Running factory"
        );

        let value = factory(owner)?;
        Ok(self.store(value))
    }

    /// Produce through whichever producer this registration holds.
    ///
    /// The guard spans the whole awaited execution, so an async factory that
    /// awaits its own resolution is reported as a cycle.
    pub(crate) async fn produce_async(self: Arc<Self>, owner: Container) -> Result<AnyArc> {
        let factory = match &self.producer {
            Producer::Sync(_) => return self.produce(&owner),
            Producer::Async(f) => Arc::clone(f),
        };

        if let Some(instance) = self.cached() {
            return Ok(instance);
        }

        let _guard = ResolvingGuard::acquire(&self)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "ioc_registry",
            token = self.symbol.description(),
            name = self.qualifier(),
            lifetime = self.lifetime.as_str(),
            depth = owner.depth(),
            "Awaiting async factory"
        );

        let value = factory(owner).await?;
        Ok(self.store(value))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("token", &self.symbol.description())
            .field("name", &self.qualifier())
            .field("lifetime", &self.lifetime)
            .field("async", &self.is_async())
            .field("condition", &self.condition)
            .field("cached", &self.is_cached())
            .finish()
    }
}

/// Holds a registration's `resolving` flag; clears it on drop.
///
/// Drop runs on success, error, panic unwinding and when an async
/// resolution future is dropped mid-flight.
pub(crate) struct ResolvingGuard {
    registration: Arc<Registration>,
}

impl ResolvingGuard {
    pub(crate) fn acquire(registration: &Arc<Registration>) -> Result<Self> {
        if registration
            .resolving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DiError::circular(
                registration.symbol.description(),
                registration.name(),
            ));
        }

        Ok(Self {
            registration: Arc::clone(registration),
        })
    }
}

impl Drop for ResolvingGuard {
    fn drop(&mut self) {
        self.registration.resolving.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn registration(lifetime: Lifetime, producer: Producer) -> Arc<Registration> {
        Arc::new(Registration::new(
            Symbol::intern("factory-test"),
            lifetime,
            producer,
            None,
            None,
        ))
    }

    #[test]
    fn test_singleton_caches_instance() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let reg = registration(
            Lifetime::Singleton,
            Registration::sync_producer(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))),
        );
        let container = Container::new();

        let a = reg.produce(&container).unwrap();
        let b = reg.produce(&container).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(reg.is_cached());
    }

    #[test]
    fn test_transient_never_caches() {
        let reg = registration(
            Lifetime::Transient,
            Registration::sync_producer(|_| Ok(String::from("fresh"))),
        );
        let container = Container::new();

        let a = reg.produce(&container).unwrap();
        let b = reg.produce(&container).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!reg.is_cached());
    }

    #[test]
    fn test_guard_rejects_reentry_and_releases() {
        let reg = registration(
            Lifetime::Singleton,
            Registration::sync_producer(|_| Ok(1_u8)),
        );

        let guard = ResolvingGuard::acquire(&reg).unwrap();
        assert!(reg.is_resolving());
        assert!(matches!(ResolvingGuard::acquire(&reg), Err(e) if e.is_circular()));

        drop(guard);
        assert!(!reg.is_resolving());
    }

    #[test]
    fn test_failed_factory_releases_guard() {
        let reg = registration(
            Lifetime::Singleton,
            Registration::sync_producer(|_| -> Result<u8> {
                Err(DiError::creation_failed("factory-test", "boom"))
            }),
        );
        let container = Container::new();

        assert!(matches!(
            reg.produce(&container),
            Err(DiError::CreationFailed { .. })
        ));
        assert!(!reg.is_resolving());
    }

    #[test]
    fn test_sync_produce_rejects_async_producer() {
        let reg = registration(
            Lifetime::Singleton,
            Registration::async_producer(|_| async { Ok(1_u8) }),
        );
        let container = Container::new();

        assert!(matches!(
            reg.produce(&container),
            Err(DiError::WrongResolutionMode { .. })
        ));
    }

    #[tokio::test]
    async fn test_async_singleton_caches() {
        let reg = registration(
            Lifetime::Singleton,
            Registration::async_producer(|_| async { Ok(String::from("async")) }),
        );
        let container = Container::new();

        let a = Arc::clone(&reg).produce_async(container.clone()).await.unwrap();
        let b = Arc::clone(&reg).produce_async(container).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!reg.is_resolving());
    }
}
