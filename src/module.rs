//! Module scanning
//!
//! A [`Module`] groups a configuration hook with the component types it
//! exports. [`scan_modules`] runs the hooks and registers the exports.

use crate::component::{Construct, Service};
use crate::token::Symbol;
use crate::{Binding, Container, Lifetime, Result, SharedContext};
use futures_util::future::{self, BoxFuture};
use std::fmt;

#[cfg(feature = "logging")]
use tracing::debug;

type Registrar = fn(&Container, Lifetime);

/// One component type exported by a module.
#[derive(Clone, Copy)]
pub struct Export {
    symbol: Symbol,
    /// Whether the type carries its own registration options
    decorated: bool,
    registrar: Registrar,
}

impl Export {
    /// A [`Service`]: registered with its own lifetime and name
    pub fn service<S: Service>() -> Self {
        Self {
            symbol: S::token().symbol(),
            decorated: true,
            registrar: |container, _| {
                container.register_with(&S::token(), S::binding(), S::construct);
            },
        }
    }

    /// A plain [`Construct`] type: registered only when auto-binding is on,
    /// with the scan's fallback lifetime
    pub fn constructible<C: Construct>() -> Self {
        Self {
            symbol: C::token().symbol(),
            decorated: false,
            registrar: |container, lifetime| {
                container.register_with(&C::token(), Binding::with_lifetime(lifetime), C::construct);
            },
        }
    }

    /// Descriptor of the token the export registers under
    #[inline]
    pub fn token(&self) -> Symbol {
        self.symbol
    }

    /// Whether the export carries its own registration options
    #[inline]
    pub fn is_decorated(&self) -> bool {
        self.decorated
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Export")
            .field("token", &self.symbol.description())
            .field("decorated", &self.decorated)
            .finish()
    }
}

/// A unit of configuration.
///
/// # Example
///
/// ```rust
/// use futures_util::future::BoxFuture;
/// use ioc_registry::{token, Container, Module, ScanOptions, SharedContext, scan_modules};
///
/// struct Settings;
///
/// impl Module for Settings {
///     fn configure<'a>(
///         &'a self,
///         container: &'a Container,
///         context: SharedContext,
///     ) -> BoxFuture<'a, ioc_registry::Result<()>> {
///         Box::pin(async move {
///             let port = context.read().var("PORT").unwrap_or("8080").to_owned();
///             container.singleton(&token::<String>("port"), move |_| Ok(port.clone()));
///             Ok(())
///         })
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let container = Container::new();
/// scan_modules(&container, &[&Settings], ScanOptions::default()).await.unwrap();
/// assert!(container.contains(&token::<String>("port")));
/// # });
/// ```
pub trait Module: Send + Sync {
    /// One-time configuration hook; may register directly and read the context
    fn configure<'a>(
        &'a self,
        container: &'a Container,
        context: SharedContext,
    ) -> BoxFuture<'a, Result<()>> {
        let _ = (container, context);
        Box::pin(future::ready(Ok(())))
    }

    /// Component types offered by this module
    fn exports(&self) -> Vec<Export> {
        Vec::new()
    }
}

/// Options for [`scan_modules`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Register [`Export::constructible`] entries too
    pub auto_bind_undecorated: bool,
    /// Lifetime for auto-bound entries
    pub fallback_lifetime: Lifetime,
}

impl ScanOptions {
    /// Enable auto-binding with the given fallback lifetime
    pub fn auto_bind(fallback_lifetime: Lifetime) -> Self {
        Self {
            auto_bind_undecorated: true,
            fallback_lifetime,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            auto_bind_undecorated: false,
            fallback_lifetime: Lifetime::Singleton,
        }
    }
}

/// Run each module's configure hook, then register its exports.
///
/// Modules are processed in order. Exports whose token already has a
/// variant visible from `container` are skipped, so nothing is rebound.
/// The first failing hook aborts the scan.
pub async fn scan_modules(
    container: &Container,
    modules: &[&dyn Module],
    options: ScanOptions,
) -> Result<()> {
    #[cfg(feature = "logging")]
    debug!(
        target: "ioc_registry",
        modules = modules.len(),
        auto_bind = options.auto_bind_undecorated,
        fallback_lifetime = options.fallback_lifetime.as_str(),
        "Scanning modules"
    );

    for module in modules {
        module.configure(container, container.context()).await?;

        for export in module.exports() {
            if !export.decorated && !options.auto_bind_undecorated {
                continue;
            }
            if container.contains_symbol(export.symbol) {
                #[cfg(feature = "logging")]
                debug!(
                    target: "ioc_registry",
                    token = export.symbol.description(),
                    "Export already bound, skipping"
                );
                continue;
            }

            (export.registrar)(container, options.fallback_lifetime);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{token, ResolutionContext};
    use std::sync::Arc;

    struct Repo;

    impl Construct for Repo {
        fn construct(_: &Container) -> Result<Self> {
            Ok(Repo)
        }
    }

    struct Hooked;

    impl Module for Hooked {
        fn configure<'a>(
            &'a self,
            container: &'a Container,
            context: SharedContext,
        ) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                let profile = context.read().profile().unwrap_or("none").to_owned();
                container.singleton(&token::<String>("module-test-profile"), move |_| {
                    Ok(profile.clone())
                });
                Ok(())
            })
        }

        fn exports(&self) -> Vec<Export> {
            vec![Export::constructible::<Repo>()]
        }
    }

    #[tokio::test]
    async fn test_configure_sees_context() {
        let container = Container::with_context(ResolutionContext::new().with_profile("dev"));
        scan_modules(&container, &[&Hooked], ScanOptions::default())
            .await
            .unwrap();

        let profile = container
            .resolve(&token::<String>("module-test-profile"))
            .unwrap();
        assert_eq!(*profile, "dev");
        // undecorated export ignored without auto-binding
        assert!(!container.contains(&Repo::token()));
    }

    #[tokio::test]
    async fn test_auto_bind_uses_fallback_lifetime() {
        let container = Container::with_context(ResolutionContext::new());
        scan_modules(&container, &[&Hooked], ScanOptions::auto_bind(Lifetime::Transient))
            .await
            .unwrap();

        let a = container.resolve(&Repo::token()).unwrap();
        let b = container.resolve(&Repo::token()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
