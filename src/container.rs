//! The registry
//!
//! `Container` maps tokens to registrations, selects one per resolution via
//! its policy, caches non-transient instances and delegates to its parent
//! scope when it defines no variant of a token at all.

use crate::condition::holds;
use crate::factory::{AnyArc, Producer, Registration};
use crate::lazy::{AsyncLazy, Inject, Lazy};
use crate::policy::{DefaultPolicy, ResolutionPolicy, Selection};
use crate::storage::RegistrationStorage;
use crate::token::Symbol;
use crate::{
    Binding, Condition, DiError, FlagValue, Injectable, Lifetime, ResolutionContext, Result, Scope,
    SharedContext, Token,
};
use std::sync::{Arc, PoisonError, RwLock, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

struct Inner {
    /// Registrations owned by this scope
    storage: RegistrationStorage,
    /// Non-owning back-reference used for read-only delegation
    parent: Option<Weak<Inner>>,
    policy: RwLock<Arc<dyn ResolutionPolicy>>,
    context: SharedContext,
    scope: Scope,
    depth: u32,
}

/// Token-keyed dependency injection container.
///
/// Cloning a `Container` clones a handle; clones share registrations,
/// context and policy.
///
/// # Examples
///
/// ```rust
/// use ioc_registry::{token, Binding, Container};
/// use std::sync::Arc;
///
/// struct Database { url: String }
///
/// let db = token::<Database>("Database");
/// let container = Container::new();
/// container.register_with(&db, Binding::singleton(), |_| {
///     Ok(Database { url: "postgres://localhost".into() })
/// });
///
/// let a = container.resolve(&db).unwrap();
/// let b = container.resolve(&db).unwrap();
/// assert_eq!(a.url, "postgres://localhost");
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Create a root container whose context snapshots the process environment.
    #[inline]
    pub fn new() -> Self {
        Self::with_context(ResolutionContext::from_env())
    }

    /// Create a root container with an explicit context.
    pub fn with_context(context: ResolutionContext) -> Self {
        let container = Self::from_parts(None, Arc::new(DefaultPolicy), context, 0);

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_registry",
            scope_id = container.inner.scope.id(),
            depth = 0,
            "Creating new root container"
        );

        container
    }

    fn from_parts(
        parent: Option<Weak<Inner>>,
        policy: Arc<dyn ResolutionPolicy>,
        context: ResolutionContext,
        depth: u32,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage: RegistrationStorage::new(),
                parent,
                policy: RwLock::new(policy),
                context: SharedContext::new(context),
                scope: Scope::new(),
                depth,
            }),
        }
    }

    /// Create a child scope.
    ///
    /// The child copies this container's context and policy as they are
    /// now; later changes on either side do not propagate. Lookups for
    /// tokens the child defines no variant of fall back to this container.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ioc_registry::{token, Container};
    ///
    /// let name = token::<String>("app-name");
    /// let root = Container::new();
    /// root.singleton(&name, |_| Ok("root".to_string()));
    ///
    /// let request = root.create_scope();
    /// assert_eq!(*request.resolve(&name).unwrap(), "root");
    ///
    /// request.singleton(&name, |_| Ok("request".to_string()));
    /// assert_eq!(*request.resolve(&name).unwrap(), "request");
    /// assert_eq!(*root.resolve(&name).unwrap(), "root");
    /// ```
    pub fn create_scope(&self) -> Self {
        let child_depth = self.inner.depth + 1;

        let child = Self::from_parts(
            Some(Arc::downgrade(&self.inner)),
            self.policy(),
            self.inner.context.snapshot(),
            child_depth,
        );

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_registry",
            parent_scope_id = self.inner.scope.id(),
            scope_id = child.inner.scope.id(),
            parent_depth = self.inner.depth,
            child_depth = child_depth,
            parent_registrations = self.inner.storage.len(),
            "Creating child scope from parent container"
        );

        child
    }

    /// Alias for `create_scope()`.
    #[inline]
    pub fn scope(&self) -> Self {
        self.create_scope()
    }

    /// The parent scope, if this is a child and the parent is still alive.
    pub fn parent(&self) -> Option<Container> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Container { inner })
    }

    // =========================================================================
    // Context
    // =========================================================================

    /// Merge flags into the context.
    pub fn set_flags<I, K, V>(&self, flags: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FlagValue>,
    {
        let mut ctx = self.inner.context.write();
        for (key, value) in flags {
            ctx.flags.insert(key.into(), value.into());
        }
        self
    }

    /// Set one flag.
    pub fn set_flag(&self, key: impl Into<String>, value: impl Into<FlagValue>) -> &Self {
        self.inner
            .context
            .write()
            .flags
            .insert(key.into(), value.into());
        self
    }

    /// Activate a profile.
    pub fn set_profile(&self, profile: impl Into<String>) -> &Self {
        self.inner.context.write().profile = Some(profile.into());
        self
    }

    /// Deactivate the current profile.
    pub fn clear_profile(&self) -> &Self {
        self.inner.context.write().profile = None;
        self
    }

    /// Replace the environment snapshot wholesale.
    pub fn set_env<I, K, V>(&self, env: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inner.context.write().env = env
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Replace the context clock.
    pub fn set_clock<F>(&self, clock: F) -> &Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        self.inner.context.write().clock = Arc::new(clock);
        self
    }

    /// Swap the selection policy for this container.
    pub fn set_resolution_policy<P>(&self, policy: P) -> &Self
    where
        P: ResolutionPolicy + 'static,
    {
        *self
            .inner
            .policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(policy);
        self
    }

    /// The live context; writes through it affect the next resolution.
    #[inline]
    pub fn context(&self) -> SharedContext {
        self.inner.context.clone()
    }

    fn policy(&self) -> Arc<dyn ResolutionPolicy> {
        Arc::clone(&self.inner.policy.read().unwrap_or_else(PoisonError::into_inner))
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a synchronous factory (transient, unnamed, unconditional).
    ///
    /// Registrations accumulate; nothing is ever overwritten.
    #[inline]
    pub fn register<T, F>(&self, token: &Token<T>, factory: F) -> &Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_with(token, Binding::new(), factory)
    }

    /// Register a synchronous factory with explicit options.
    ///
    /// The lifetime defaults to [`Lifetime::Transient`].
    pub fn register_with<T, F>(&self, token: &Token<T>, binding: Binding, factory: F) -> &Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        let lifetime = binding.lifetime_or(Lifetime::Transient);
        self.insert(
            token.symbol(),
            lifetime,
            Registration::sync_producer(factory),
            binding,
        )
    }

    /// Register an asynchronous factory (transient, unnamed, unconditional).
    #[inline]
    pub fn register_async<T, F, Fut>(&self, token: &Token<T>, factory: F) -> &Self
    where
        T: Injectable,
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.register_async_with(token, Binding::new(), factory)
    }

    /// Register an asynchronous factory with explicit options.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ioc_registry::{token, Binding, Container};
    ///
    /// let data = token::<Vec<u8>>("payload");
    /// let container = Container::new();
    /// container.register_async_with(&data, Binding::singleton(), |_| async {
    ///     Ok(vec![1, 2, 3])
    /// });
    ///
    /// // only resolve_async can drive it
    /// assert!(container.resolve(&data).is_err());
    /// ```
    pub fn register_async_with<T, F, Fut>(
        &self,
        token: &Token<T>,
        binding: Binding,
        factory: F,
    ) -> &Self
    where
        T: Injectable,
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let lifetime = binding.lifetime_or(Lifetime::Transient);
        self.insert(
            token.symbol(),
            lifetime,
            Registration::async_producer(factory),
            binding,
        )
    }

    /// Register a singleton factory (created on first resolve, then cached).
    #[inline]
    pub fn singleton<T, F>(&self, token: &Token<T>, factory: F) -> &Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_with(token, Binding::singleton(), factory)
    }

    /// Register a scoped factory (cached per owning container).
    #[inline]
    pub fn scoped<T, F>(&self, token: &Token<T>, factory: F) -> &Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_with(token, Binding::scoped(), factory)
    }

    /// Register a transient factory (fresh instance on every resolve).
    #[inline]
    pub fn transient<T, F>(&self, token: &Token<T>, factory: F) -> &Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_with(token, Binding::transient(), factory)
    }

    /// Register a factory that is eligible only while `env[key] == value`.
    ///
    /// Unlike `register`, the lifetime defaults to [`Lifetime::Singleton`].
    #[inline]
    pub fn when_env<T, F>(
        &self,
        token: &Token<T>,
        key: &str,
        value: &str,
        binding: Binding,
        factory: F,
    ) -> &Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_conditional(token, Condition::env_equals(key, value), binding, factory)
    }

    /// Register a factory that is eligible only while flag `key` is exactly `expected`.
    ///
    /// Unlike `register`, the lifetime defaults to [`Lifetime::Singleton`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ioc_registry::{token, Binding, Container};
    ///
    /// let payment = token::<&'static str>("IPayment");
    /// let container = Container::new();
    /// container.when_flag(&payment, "debug", true, Binding::new().named("mock"), |_| Ok("MOCK"));
    /// container.singleton(&payment, |_| Ok("LIVE"));
    ///
    /// assert!(container.resolve_named(&payment, "mock").is_err());
    /// container.set_flag("debug", true);
    /// assert_eq!(*container.resolve_named(&payment, "mock").unwrap(), "MOCK");
    /// assert_eq!(*container.resolve(&payment).unwrap(), "LIVE");
    /// ```
    #[inline]
    pub fn when_flag<T, F>(
        &self,
        token: &Token<T>,
        key: &str,
        expected: bool,
        binding: Binding,
        factory: F,
    ) -> &Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_conditional(token, Condition::flag_eq(key, expected), binding, factory)
    }

    /// Register a factory that is eligible only while `profile` is active.
    ///
    /// Unlike `register`, the lifetime defaults to [`Lifetime::Singleton`].
    #[inline]
    pub fn when_profile<T, F>(
        &self,
        token: &Token<T>,
        profile: &str,
        binding: Binding,
        factory: F,
    ) -> &Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_conditional(token, Condition::profile(profile), binding, factory)
    }

    /// Register a factory gated by an arbitrary predicate over the context.
    ///
    /// Unlike `register`, the lifetime defaults to [`Lifetime::Singleton`].
    #[inline]
    pub fn when<T, P, F>(&self, token: &Token<T>, predicate: P, binding: Binding, factory: F) -> &Self
    where
        T: Injectable,
        P: Fn(&ResolutionContext) -> bool + Send + Sync + 'static,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_conditional(token, Condition::predicate(predicate), binding, factory)
    }

    fn register_conditional<T, F>(
        &self,
        token: &Token<T>,
        condition: Condition,
        binding: Binding,
        factory: F,
    ) -> &Self
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        let lifetime = binding.lifetime_or(Lifetime::Singleton);
        self.insert(
            token.symbol(),
            lifetime,
            Registration::sync_producer(factory),
            binding.when(condition),
        )
    }

    fn insert(&self, symbol: Symbol, lifetime: Lifetime, producer: Producer, binding: Binding) -> &Self {
        let registration = Registration::new(symbol, lifetime, producer, binding.name, binding.condition);

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_registry",
            token = symbol.description(),
            name = registration.qualifier(),
            lifetime = lifetime.as_str(),
            asynchronous = registration.is_async(),
            conditional = registration.condition().is_some(),
            depth = self.inner.depth,
            registrations = self.inner.storage.len() + 1,
            "Registering service"
        );

        self.inner.storage.insert(Arc::new(registration));
        self
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve the token's selected variant.
    ///
    /// Fails with `MissingOrAmbiguous` when the policy selects nothing,
    /// `WrongResolutionMode` for async-only registrations and
    /// `CircularDependency` when the selected factory is already running.
    #[inline]
    pub fn resolve<T: Injectable>(&self, token: &Token<T>) -> Result<Arc<T>> {
        self.resolve_with(token, None)
    }

    /// Resolve a named variant. There is no fallback to the default variant.
    #[inline]
    pub fn resolve_named<T: Injectable>(&self, token: &Token<T>, name: &str) -> Result<Arc<T>> {
        self.resolve_with(token, Some(name))
    }

    /// Resolve with an optional requested name.
    pub fn resolve_with<T: Injectable>(&self, token: &Token<T>, name: Option<&str>) -> Result<Arc<T>> {
        let symbol = token.symbol();
        let (owner, registration) = self.select(symbol, name)?;
        let instance = registration.produce(&owner)?;
        downcast(symbol, instance)
    }

    /// Try to resolve, returning None on any failure.
    #[inline]
    pub fn try_resolve<T: Injectable>(&self, token: &Token<T>) -> Option<Arc<T>> {
        self.resolve(token).ok()
    }

    /// Resolve asynchronously. Sync registrations resolve as with `resolve`.
    #[inline]
    pub async fn resolve_async<T: Injectable>(&self, token: &Token<T>) -> Result<Arc<T>> {
        self.resolve_async_with(token, None).await
    }

    /// Resolve a named variant asynchronously.
    #[inline]
    pub async fn resolve_async_named<T: Injectable>(
        &self,
        token: &Token<T>,
        name: &str,
    ) -> Result<Arc<T>> {
        self.resolve_async_with(token, Some(name)).await
    }

    /// Resolve asynchronously with an optional requested name.
    pub async fn resolve_async_with<T: Injectable>(
        &self,
        token: &Token<T>,
        name: Option<&str>,
    ) -> Result<Arc<T>> {
        let symbol = token.symbol();
        let (owner, registration) = self.select(symbol, name)?;
        let instance = registration.produce_async(owner).await?;
        downcast(symbol, instance)
    }

    /// Resolve every variant (any name) whose condition holds.
    ///
    /// Parent variants are used only when this scope defines none at all;
    /// they replace, never merge with, local ones.
    pub fn resolve_all<T: Injectable>(&self, token: &Token<T>) -> Result<Vec<Arc<T>>> {
        let symbol = token.symbol();
        let Some((owner, candidates)) = self.lookup(symbol)? else {
            return Ok(Vec::new());
        };

        let matching = self.eligible(&candidates);
        if matching.iter().any(|r| r.is_async()) {
            return Err(DiError::AsyncBindingPresent {
                token: symbol.description(),
            });
        }

        matching
            .iter()
            .map(|r| r.produce(&owner).and_then(|instance| downcast(symbol, instance)))
            .collect()
    }

    /// Like `resolve_all`, awaiting async registrations in discovery order.
    pub async fn resolve_all_async<T: Injectable>(&self, token: &Token<T>) -> Result<Vec<Arc<T>>> {
        let symbol = token.symbol();
        let Some((owner, candidates)) = self.lookup(symbol)? else {
            return Ok(Vec::new());
        };

        let matching = self.eligible(&candidates);
        let mut out = Vec::with_capacity(matching.len());
        for registration in matching {
            let instance = registration.produce_async(owner.clone()).await?;
            out.push(downcast(symbol, instance)?);
        }
        Ok(out)
    }

    // =========================================================================
    // Lazy Resolution
    // =========================================================================

    /// A deferred accessor for the token.
    ///
    /// The registration is selected now (failing now if it can't be) to
    /// learn its lifetime; the value is produced on first [`Lazy::get`].
    /// Non-transient values are memoized in the handle.
    #[inline]
    pub fn resolve_lazy<T: Injectable>(&self, token: &Token<T>) -> Result<Lazy<T>> {
        self.resolve_lazy_with(token, None)
    }

    /// A deferred accessor for a named variant.
    #[inline]
    pub fn resolve_lazy_named<T: Injectable>(&self, token: &Token<T>, name: &str) -> Result<Lazy<T>> {
        self.resolve_lazy_with(token, Some(name))
    }

    fn resolve_lazy_with<T: Injectable>(&self, token: &Token<T>, name: Option<&str>) -> Result<Lazy<T>> {
        let (_, sampled) = self.select(token.symbol(), name)?;
        Ok(Lazy::new(self, *token, name.map(Arc::from), &sampled))
    }

    /// A deferred async accessor for the token.
    #[inline]
    pub fn resolve_lazy_async<T: Injectable>(&self, token: &Token<T>) -> Result<AsyncLazy<T>> {
        self.resolve_lazy_async_with(token, None)
    }

    /// A deferred async accessor for a named variant.
    #[inline]
    pub fn resolve_lazy_async_named<T: Injectable>(
        &self,
        token: &Token<T>,
        name: &str,
    ) -> Result<AsyncLazy<T>> {
        self.resolve_lazy_async_with(token, Some(name))
    }

    fn resolve_lazy_async_with<T: Injectable>(
        &self,
        token: &Token<T>,
        name: Option<&str>,
    ) -> Result<AsyncLazy<T>> {
        let (_, sampled) = self.select(token.symbol(), name)?;
        Ok(AsyncLazy::new(self, *token, name.map(Arc::from), &sampled))
    }

    /// A lazily-resolved field value, for structs that hold their dependencies.
    #[inline]
    pub fn inject_lazy<T: Injectable>(&self, token: &Token<T>) -> Result<Inject<T>> {
        self.resolve_lazy(token).map(Inject::from)
    }

    /// A lazily-resolved field value for a named variant.
    #[inline]
    pub fn inject_lazy_named<T: Injectable>(&self, token: &Token<T>, name: &str) -> Result<Inject<T>> {
        self.resolve_lazy_named(token, name).map(Inject::from)
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Whether any variant of the token exists here or, if none exists
    /// here, in the nearest ancestor that defines one.
    #[inline]
    pub fn contains<T>(&self, token: &Token<T>) -> bool {
        self.contains_symbol(token.symbol())
    }

    pub(crate) fn contains_symbol(&self, symbol: Symbol) -> bool {
        matches!(self.lookup(symbol), Ok(Some(_)))
    }

    /// Number of registrations in this scope (not including parents).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.storage.len()
    }

    /// Check if this scope has no registrations.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.storage.is_empty()
    }

    /// Tokens registered in this scope.
    pub fn registered_tokens(&self) -> Vec<Symbol> {
        self.inner.storage.symbols()
    }

    /// Get the scope depth (0 = root).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.inner.depth
    }

    /// This container's scope identifier.
    #[inline]
    pub fn scope_id(&self) -> Scope {
        self.inner.scope
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Variants of `symbol` from the nearest scope that defines at least one.
    ///
    /// Partial local presence blocks fallback: if this scope has any variant,
    /// ancestors are never consulted.
    fn lookup(&self, symbol: Symbol) -> Result<Option<(Container, Vec<Arc<Registration>>)>> {
        let mut current = self.clone();
        loop {
            if current.inner.storage.contains(symbol) {
                let variants = current.inner.storage.variants(symbol);
                return Ok(Some((current, variants)));
            }

            let Some(parent) = current.inner.parent.as_ref() else {
                return Ok(None);
            };
            let inner = parent.upgrade().ok_or(DiError::ParentDropped)?;

            #[cfg(feature = "logging")]
            trace!(
                target: "ioc_registry",
                token = symbol.description(),
                depth = current.inner.depth,
                "No local variants, delegating to parent scope"
            );

            current = Container { inner };
        }
    }

    /// Run the policy over the candidates with this container's context.
    fn select(&self, symbol: Symbol, name: Option<&str>) -> Result<(Container, Arc<Registration>)> {
        let Some((owner, candidates)) = self.lookup(symbol)? else {
            #[cfg(feature = "logging")]
            debug!(
                target: "ioc_registry",
                token = symbol.description(),
                name = name.unwrap_or("auto"),
                depth = self.inner.depth,
                "Token not registered in container or parent chain"
            );
            return Err(DiError::missing(symbol.description(), name));
        };

        let policy = self.policy();
        let selected = {
            let context = self.inner.context.read();
            policy.select(&Selection {
                token: symbol,
                candidates: &candidates,
                requested_name: name,
                context: &context,
            })
        };

        match selected {
            Some(registration) => Ok((owner, registration)),
            None => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "ioc_registry",
                    token = symbol.description(),
                    name = name.unwrap_or("auto"),
                    candidates = candidates.len(),
                    depth = self.inner.depth,
                    "No unique registration selected"
                );
                Err(DiError::missing(symbol.description(), name))
            }
        }
    }

    /// Candidates whose condition holds against this container's context
    fn eligible(&self, candidates: &[Arc<Registration>]) -> Vec<Arc<Registration>> {
        let context = self.inner.context.read();
        candidates
            .iter()
            .filter(|r| holds(r.condition(), &context))
            .cloned()
            .collect()
    }
}

fn downcast<T: Injectable>(symbol: Symbol, instance: AnyArc) -> Result<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| DiError::type_mismatch::<T>(symbol.description()))
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("scope", &self.inner.scope)
            .field("registrations", &self.len())
            .field("depth", &self.inner.depth)
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestService {
        value: String,
    }

    fn empty() -> Container {
        Container::with_context(ResolutionContext::new())
    }

    #[test]
    fn test_singleton() {
        let t = token::<TestService>("container-test-singleton");
        let container = empty();
        container.singleton(&t, |_| {
            Ok(TestService {
                value: "test".into(),
            })
        });

        let s1 = container.resolve(&t).unwrap();
        let s2 = container.resolve(&t).unwrap();

        assert_eq!(s1.value, "test");
        assert!(Arc::ptr_eq(&s1, &s2));
    }

    #[test]
    fn test_register_defaults_to_transient() {
        let t = token::<TestService>("container-test-transient");
        let container = empty();
        container.register(&t, |_| Ok(TestService { value: "t".into() }));

        let s1 = container.resolve(&t).unwrap();
        let s2 = container.resolve(&t).unwrap();

        assert!(!Arc::ptr_eq(&s1, &s2));
    }

    #[test]
    fn test_when_helpers_default_to_singleton() {
        let t = token::<TestService>("container-test-when-singleton");
        let container = empty();
        container.when(&t, |_| true, Binding::new(), |_| Ok(TestService { value: "w".into() }));

        let s1 = container.resolve(&t).unwrap();
        let s2 = container.resolve(&t).unwrap();

        assert!(Arc::ptr_eq(&s1, &s2));
    }

    #[test]
    fn test_factory_receives_container() {
        let url = token::<String>("container-test-url");
        let svc = token::<TestService>("container-test-dependent");
        let container = empty();
        container.singleton(&url, |_| Ok("postgres://localhost".to_string()));
        container.singleton(&svc, move |c| {
            let url = c.resolve(&url)?;
            Ok(TestService {
                value: url.as_str().to_owned(),
            })
        });

        assert_eq!(container.resolve(&svc).unwrap().value, "postgres://localhost");
    }

    #[test]
    fn test_not_found() {
        let t = token::<TestService>("container-test-missing");
        let container = empty();

        assert!(matches!(
            container.resolve(&t),
            Err(DiError::MissingOrAmbiguous { name: None, .. })
        ));
        assert!(container.try_resolve(&t).is_none());
        assert!(!container.contains(&t));
    }

    #[test]
    fn test_type_mismatch_on_shared_descriptor() {
        let as_u32 = token::<u32>("container-test-mismatch");
        let as_string = token::<String>("container-test-mismatch");
        let container = empty();
        container.register(&as_u32, |_| Ok(7_u32));

        assert!(matches!(
            container.resolve(&as_string),
            Err(DiError::TypeMismatch { .. })
        ));
        assert_eq!(*container.resolve(&as_u32).unwrap(), 7);
    }

    #[test]
    fn test_factory_error_does_not_wedge_registration() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let t = token::<u32>("container-test-flaky");
        let container = empty();
        container.singleton(&t, move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DiError::creation_failed("container-test-flaky", "first attempt"))
            } else {
                Ok(99)
            }
        });

        assert!(matches!(
            container.resolve(&t),
            Err(DiError::CreationFailed { .. })
        ));
        assert_eq!(*container.resolve(&t).unwrap(), 99);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_scope_copies_context_by_value() {
        let root = empty();
        root.set_flag("debug", true).set_profile("dev");

        let child = root.create_scope();
        root.set_flag("debug", false).set_profile("prod");

        let ctx = child.context();
        let ctx = ctx.read();
        assert_eq!(ctx.flag("debug"), Some(&FlagValue::Bool(true)));
        assert_eq!(ctx.profile(), Some("dev"));
    }

    #[test]
    fn test_scope_copies_policy() {
        let t = token::<u32>("container-test-policy-copy");
        let root = empty();
        root.set_resolution_policy(|sel: &Selection<'_>| sel.eligible().last().cloned());
        root.register_with(&t, Binding::new().named("a"), |_| Ok(1));
        root.register_with(&t, Binding::new().named("b"), |_| Ok(2));

        let child = root.create_scope();
        assert_eq!(*child.resolve(&t).unwrap(), 2);
    }

    #[test]
    fn test_child_conditions_use_child_context() {
        let t = token::<&'static str>("container-test-child-context");
        let root = empty();
        root.when_profile(&t, "test", Binding::new(), |_| Ok("test"));

        let child = root.create_scope();
        assert!(child.resolve(&t).is_err());

        child.set_profile("test");
        assert_eq!(*child.resolve(&t).unwrap(), "test");
        // the parent's own context is untouched
        assert!(root.resolve(&t).is_err());
    }

    #[test]
    fn test_deep_parent_chain() {
        let root_t = token::<u32>("container-test-deep-root");
        let leaf_t = token::<u32>("container-test-deep-leaf");

        let root = empty();
        root.singleton(&root_t, |_| Ok(1));

        let middle = root.create_scope();
        let leaf = middle.create_scope();
        leaf.singleton(&leaf_t, |_| Ok(3));

        assert_eq!(leaf.depth(), 2);
        assert_eq!(*leaf.resolve(&root_t).unwrap(), 1);
        assert_eq!(*leaf.resolve(&leaf_t).unwrap(), 3);
        assert!(!middle.contains(&leaf_t));
        assert!(leaf.contains(&root_t));
    }

    #[test]
    fn test_parent_singleton_shared_with_children() {
        let t = token::<TestService>("container-test-shared-parent");
        let root = empty();
        root.singleton(&t, |_| Ok(TestService { value: "root".into() }));

        let a = root.create_scope().resolve(&t).unwrap();
        let b = root.create_scope().resolve(&t).unwrap();
        let c = root.resolve(&t).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_dropped_parent_is_reported() {
        let t = token::<u32>("container-test-dropped-parent");
        let root = empty();
        let child = root.create_scope();
        drop(root);

        assert!(child.parent().is_none());
        assert!(matches!(child.resolve(&t), Err(DiError::ParentDropped)));
    }

    #[test]
    fn test_factory_may_register_during_resolution() {
        let outer = token::<u32>("container-test-reg-outer");
        let inner = token::<u32>("container-test-reg-inner");
        let container = empty();
        container.singleton(&outer, move |c| {
            c.singleton(&inner, |_| Ok(5));
            c.resolve(&inner).map(|v| *v + 1)
        });

        assert_eq!(*container.resolve(&outer).unwrap(), 6);
    }

    #[test]
    fn test_len_and_registered_tokens() {
        let t = token::<u32>("container-test-len");
        let container = empty();
        assert!(container.is_empty());

        container.register(&t, |_| Ok(1));
        container.register_with(&t, Binding::new().named("x"), |_| Ok(2));

        assert_eq!(container.len(), 2);
        assert_eq!(container.registered_tokens(), vec![t.symbol()]);
    }
}
