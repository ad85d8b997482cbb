//! Provider traits and registration options
//!
//! These types define what can be injected and how a registration behaves.

use crate::Condition;
use std::sync::Arc;

/// Marker trait for types that can be produced by the container.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// Service lifetime specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// One instance per owning scope, created on first resolve
    Singleton,

    /// Same caching as `Singleton`; a label for callers that create a scope per request
    Scoped,

    /// New instance created on every resolve
    #[default]
    Transient,
}

impl Lifetime {
    /// Whether instances are cached on the registration
    #[inline]
    pub fn is_cached(self) -> bool {
        !matches!(self, Lifetime::Transient)
    }

    /// Lowercase label used in logs
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options attached to one registration: lifetime, variant name, condition.
///
/// The lifetime is optional on purpose. Plain `register*` calls fall back to
/// [`Lifetime::Transient`] while the conditional `when_*` helpers fall back to
/// [`Lifetime::Singleton`].
///
/// # Examples
///
/// ```rust
/// use ioc_registry::{token, Binding, Condition, Container, Lifetime};
///
/// let greeting = token::<String>("greeting");
/// let container = Container::new();
///
/// container.register_with(
///     &greeting,
///     Binding::singleton().named("loud").when(Condition::flag("shout")),
///     |_| Ok("HELLO".to_string()),
/// );
///
/// let binding = Binding::new().named("quiet");
/// assert_eq!(binding.lifetime_or(Lifetime::Transient), Lifetime::Transient);
/// ```
#[derive(Clone, Default)]
pub struct Binding {
    pub(crate) lifetime: Option<Lifetime>,
    pub(crate) name: Option<Arc<str>>,
    pub(crate) condition: Option<Condition>,
}

impl Binding {
    /// Empty options: default lifetime, unnamed, unconditional
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with an explicit lifetime
    #[inline]
    pub fn with_lifetime(lifetime: Lifetime) -> Self {
        Self {
            lifetime: Some(lifetime),
            ..Self::default()
        }
    }

    /// Shorthand for `Binding::with_lifetime(Lifetime::Singleton)`
    #[inline]
    pub fn singleton() -> Self {
        Self::with_lifetime(Lifetime::Singleton)
    }

    /// Shorthand for `Binding::with_lifetime(Lifetime::Scoped)`
    #[inline]
    pub fn scoped() -> Self {
        Self::with_lifetime(Lifetime::Scoped)
    }

    /// Shorthand for `Binding::with_lifetime(Lifetime::Transient)`
    #[inline]
    pub fn transient() -> Self {
        Self::with_lifetime(Lifetime::Transient)
    }

    /// Override the lifetime
    #[inline]
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Register under a variant name instead of `default`
    #[inline]
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Gate the registration on a condition
    #[inline]
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// The configured lifetime, or `fallback` when none was set
    #[inline]
    pub fn lifetime_or(&self, fallback: Lifetime) -> Lifetime {
        self.lifetime.unwrap_or(fallback)
    }

    /// The configured variant name
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("lifetime", &self.lifetime)
            .field("name", &self.name)
            .field("condition", &self.condition)
            .finish()
    }
}
