//! Constructible components and services
//!
//! Types describe how they are built from a container, and optionally how
//! they want to be registered. [`ServiceProvider`] turns that description
//! into an ordinary registration.
//!
//! # Example
//!
//! ```rust
//! use ioc_registry::{Construct, Container, Lifetime, Result, Service, ServiceProvider};
//! use std::sync::Arc;
//!
//! struct Config {
//!     debug: bool,
//! }
//!
//! impl Construct for Config {
//!     fn construct(_: &Container) -> Result<Self> {
//!         Ok(Config { debug: true })
//!     }
//! }
//!
//! impl Service for Config {}
//!
//! struct Logger {
//!     config: Arc<Config>,
//! }
//!
//! impl Construct for Logger {
//!     fn construct(c: &Container) -> Result<Self> {
//!         Ok(Logger { config: c.resolve(&Config::token())? })
//!     }
//! }
//!
//! impl Service for Logger {
//!     const LIFETIME: Lifetime = Lifetime::Transient;
//! }
//!
//! let container = Container::new();
//! container.provide::<Config>().provide::<Logger>();
//!
//! let logger = container.resolve(&Logger::token()).unwrap();
//! assert!(logger.config.debug);
//! ```

use crate::{Binding, Container, Injectable, Lifetime, Result, Token};

/// A type the container knows how to build.
///
/// The default token is named after the type (`my_app::Database` becomes
/// `Database`); override [`Construct::token`] to bind under another token.
pub trait Construct: Injectable + Sized {
    /// The token this type is registered and resolved under
    fn token() -> Token<Self> {
        Token::of_type()
    }

    /// Build an instance, resolving dependencies from `container`
    fn construct(container: &Container) -> Result<Self>;
}

/// A [`Construct`] type that carries its own registration options.
pub trait Service: Construct {
    /// Lifetime used by [`ServiceProvider::provide`]
    const LIFETIME: Lifetime = Lifetime::Singleton;

    /// Variant name, `None` for the default variant
    const NAME: Option<&'static str> = None;

    /// Registration options derived from `LIFETIME` and `NAME`
    fn binding() -> Binding {
        let binding = Binding::with_lifetime(Self::LIFETIME);
        match Self::NAME {
            Some(name) => binding.named(name),
            None => binding,
        }
    }
}

// =============================================================================
// ServiceProvider Trait - Registration from type descriptions
// =============================================================================

/// Extension trait registering [`Construct`] and [`Service`] types.
pub trait ServiceProvider {
    /// Register `S` under its own token with its own options.
    fn provide<S: Service>(&self) -> &Self;

    /// Register `C` under its own token with explicit options.
    ///
    /// An unset lifetime in `binding` falls back to transient, as with
    /// [`Container::register_with`].
    fn provide_as<C: Construct>(&self, binding: Binding) -> &Self;
}

impl ServiceProvider for Container {
    #[inline]
    fn provide<S: Service>(&self) -> &Self {
        self.register_with(&S::token(), S::binding(), S::construct)
    }

    #[inline]
    fn provide_as<C: Construct>(&self, binding: Binding) -> &Self {
        self.register_with(&C::token(), binding, C::construct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{token, DiError, ResolutionContext};
    use std::sync::Arc;

    struct Clock {
        offset: u64,
    }

    impl Construct for Clock {
        fn construct(_: &Container) -> Result<Self> {
            Ok(Clock { offset: 5 })
        }
    }

    impl Service for Clock {}

    struct Scheduler {
        clock: Arc<Clock>,
    }

    impl Construct for Scheduler {
        fn token() -> Token<Self> {
            token("IScheduler")
        }

        fn construct(c: &Container) -> Result<Self> {
            Ok(Scheduler {
                clock: c.resolve(&Clock::token())?,
            })
        }
    }

    impl Service for Scheduler {
        const LIFETIME: Lifetime = Lifetime::Transient;
        const NAME: Option<&'static str> = Some("cron");
    }

    fn empty() -> Container {
        Container::with_context(ResolutionContext::new())
    }

    #[test]
    fn test_default_token_is_type_name() {
        assert_eq!(Clock::token().description(), "Clock");
        assert_eq!(Scheduler::token().description(), "IScheduler");
    }

    #[test]
    fn test_provide_uses_service_options() {
        let container = empty();
        container.provide::<Clock>().provide::<Scheduler>();

        let a = container.resolve_named(&Scheduler::token(), "cron").unwrap();
        let b = container.resolve_named(&Scheduler::token(), "cron").unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a.clock, &b.clock));
        assert_eq!(a.clock.offset, 5);
    }

    #[test]
    fn test_missing_dependency_propagates() {
        let container = empty();
        container.provide::<Scheduler>();

        assert!(matches!(
            container.resolve_named(&Scheduler::token(), "cron"),
            Err(DiError::MissingOrAmbiguous { token: "Clock", .. })
        ));
    }

    #[test]
    fn test_provide_as_defaults_to_transient() {
        let container = empty();
        container.provide_as::<Clock>(Binding::new());

        let a = container.resolve(&Clock::token()).unwrap();
        let b = container.resolve(&Clock::token()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
