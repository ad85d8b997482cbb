//! # ioc-registry - Token-keyed Dependency Injection for Rust
//!
//! A registry mapping service tokens to factories, with lifetime management,
//! named variants, conditional bindings, sync and async resolution, lazy
//! handles and parent/child scopes.
//!
//! ## Features
//!
//! - **Tokens** - Services are keyed by interned [`Token<T>`]s, not by type
//! - **Variants** - Several registrations per token, selected by name
//! - **Conditions** - Bindings gated on environment, flags, profile or a predicate
//! - **Lifetimes** - Singleton, scoped and transient
//! - **Async factories** - `resolve_async` awaits them; caching is shared
//! - **Scopes** - Child containers shadow, never mutate, their parents
//! - **Cycle detection** - Re-entrant resolution fails instead of recursing
//! - **Pluggable policy** - Swap how one candidate is chosen
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use ioc_registry::{token, Binding, Container};
//!
//! struct Logger { prefix: String }
//! struct Repo { logger: std::sync::Arc<Logger>, fixed: bool }
//!
//! let logger = token::<Logger>("ILogger");
//! let repo = token::<Repo>("IRepo");
//!
//! let container = Container::new();
//! container.singleton(&logger, |_| Ok(Logger { prefix: "[log]".into() }));
//! container.transient(&repo, move |c| Ok(Repo { logger: c.resolve(&logger)?, fixed: false }));
//! container.register_with(&repo, Binding::singleton().named("fixed"), move |c| {
//!     Ok(Repo { logger: c.resolve(&logger)?, fixed: true })
//! });
//!
//! let a = container.resolve(&repo).unwrap();
//! let fixed = container.resolve_named(&repo, "fixed").unwrap();
//! assert!(!a.fixed && fixed.fixed);
//! assert_eq!(a.logger.prefix, "[log]");
//! ```
//!
//! ## Conditional Bindings
//!
//! ```rust
//! use ioc_registry::{token, Binding, Container, ResolutionContext};
//!
//! let store = token::<&'static str>("IStore");
//! let container = Container::with_context(ResolutionContext::new());
//! container.when_profile(&store, "test", Binding::new(), |_| Ok("memory"));
//! container.when_env(&store, "APP_ENV", "production", Binding::new(), |_| Ok("postgres"));
//!
//! assert!(container.resolve(&store).is_err());
//!
//! container.set_profile("test");
//! assert_eq!(*container.resolve(&store).unwrap(), "memory");
//! ```
//!
//! ## Scoped Containers
//!
//! ```rust
//! use ioc_registry::{token, Container};
//!
//! let config = token::<String>("AppConfig");
//! let request = token::<u64>("RequestId");
//!
//! let root = Container::new();
//! root.singleton(&config, |_| Ok("MyApp".to_string()));
//!
//! let scope = root.create_scope();
//! scope.scoped(&request, |_| Ok(123));
//!
//! assert!(scope.contains(&config));
//! assert!(scope.contains(&request));
//! assert!(!root.contains(&request));
//! ```

mod component;
mod condition;
mod container;
mod context;
mod error;
mod factory;
mod global;
mod lazy;
#[cfg(feature = "logging")]
pub mod logging;
mod module;
mod policy;
mod provider;
mod scope;
mod storage;
mod token;

pub use component::{Construct, Service, ServiceProvider};
pub use condition::{Condition, EnvCheck, Predicate};
pub use container::Container;
pub use context::{Clock, FlagValue, ResolutionContext, SharedContext};
pub use error::{DiError, Result};
pub use factory::{DEFAULT_NAME, Registration};
pub use global::{global, reset_global};
pub use lazy::{AsyncLazy, Inject, Lazy, LazyValue, Produced};
pub use module::{Export, Module, ScanOptions, scan_modules};
pub use policy::{DefaultPolicy, ResolutionPolicy, Selection};
pub use provider::{Binding, Injectable, Lifetime};
pub use scope::Scope;
pub use token::{Symbol, Token, token};

#[cfg(feature = "derive")]
pub use ioc_registry_derive::{Construct, Service};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Binding, Condition, Construct, Container, DiError, Injectable, Lazy, Lifetime, Module,
        ResolutionContext, Result, ScanOptions, Service, ServiceProvider, Token, token,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Database {
        url: String,
    }

    #[test]
    fn test_override_in_scope() {
        let db = token::<Database>("lib-test-database");
        let root = Container::with_context(ResolutionContext::new());
        root.singleton(&db, |_| {
            Ok(Database {
                url: "production".into(),
            })
        });

        let test_scope = root.scope();
        test_scope.singleton(&db, |_| Ok(Database { url: "test".into() }));

        assert_eq!(root.resolve(&db).unwrap().url, "production");
        assert_eq!(test_scope.resolve(&db).unwrap().url, "test");
    }

    #[test]
    fn test_same_description_same_token() {
        let a = token::<Database>("lib-test-shared");
        let b = token::<Database>("lib-test-shared");
        let container = Container::with_context(ResolutionContext::new());
        container.singleton(&a, |_| Ok(Database { url: "x".into() }));

        assert!(Arc::ptr_eq(
            &container.resolve(&a).unwrap(),
            &container.resolve(&b).unwrap()
        ));
    }
}
