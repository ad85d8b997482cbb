//! Module configuration hooks, exports and the global registry

use futures_util::future::BoxFuture;
use ioc_registry::{
    Binding, Construct, Container, Export, Lifetime, Module, ResolutionContext, Result,
    ScanOptions, Service, SharedContext, global, reset_global, scan_modules, token,
};
use std::sync::Arc;

struct SyncConfigured;

impl Module for SyncConfigured {
    fn configure<'a>(
        &'a self,
        container: &'a Container,
        _context: SharedContext,
    ) -> BoxFuture<'a, Result<()>> {
        container.register_with(&token::<u32>("CfgVal"), Binding::singleton(), |_| Ok(1));
        Box::pin(futures_util::future::ready(Ok(())))
    }
}

struct AsyncConfigured;

impl Module for AsyncConfigured {
    fn configure<'a>(
        &'a self,
        container: &'a Container,
        _context: SharedContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            container.register_with(
                &token::<u32>("CfgVal"),
                Binding::singleton().named("two"),
                |_| Ok(2),
            );
            Ok(())
        })
    }
}

#[tokio::test]
async fn configure_hooks_run_in_order() {
    let c = Container::with_context(ResolutionContext::new());
    scan_modules(&c, &[&SyncConfigured, &AsyncConfigured], ScanOptions::default())
        .await
        .unwrap();

    let mut all: Vec<u32> = c
        .resolve_all(&token::<u32>("CfgVal"))
        .unwrap()
        .iter()
        .map(|v| **v)
        .collect();
    all.sort_unstable();
    assert_eq!(all, [1, 2]);
}

struct Failing;

impl Module for Failing {
    fn configure<'a>(
        &'a self,
        _container: &'a Container,
        _context: SharedContext,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Err(ioc_registry::DiError::creation_failed("Failing", "bad config")) })
    }

    fn exports(&self) -> Vec<Export> {
        vec![Export::constructible::<A>()]
    }
}

#[tokio::test]
async fn failing_hook_aborts_scan() {
    let c = Container::with_context(ResolutionContext::new());
    let result = scan_modules(&c, &[&Failing], ScanOptions::auto_bind(Lifetime::Singleton)).await;

    assert!(result.is_err());
    assert!(!c.contains(&A::token()));
}

// =============================================================================
// Exports
// =============================================================================

struct A {
    val: u32,
}

impl Construct for A {
    fn construct(_: &Container) -> Result<Self> {
        Ok(A { val: 7 })
    }
}

struct B {
    a: Arc<A>,
}

impl Construct for B {
    fn construct(c: &Container) -> Result<Self> {
        Ok(B {
            a: c.resolve(&A::token())?,
        })
    }
}

struct Exports;

impl Module for Exports {
    fn exports(&self) -> Vec<Export> {
        vec![Export::constructible::<A>(), Export::constructible::<B>()]
    }
}

#[tokio::test]
async fn auto_binds_undecorated_exports_under_type_names() {
    let c = Container::with_context(ResolutionContext::new());
    scan_modules(&c, &[&Exports], ScanOptions::auto_bind(Lifetime::Transient))
        .await
        .unwrap();

    let tb = token::<B>("B");
    let b1 = c.resolve(&tb).unwrap();
    let b2 = c.resolve(&tb).unwrap();
    assert_eq!(b1.a.val, 7);
    assert!(!Arc::ptr_eq(&b1, &b2));
}

struct Already;

impl Construct for Already {
    fn token() -> ioc_registry::Token<Self> {
        token("SvcAlready")
    }

    fn construct(_: &Container) -> Result<Self> {
        Ok(Already)
    }
}

impl Service for Already {}

struct Decorated;

impl Module for Decorated {
    fn exports(&self) -> Vec<Export> {
        vec![Export::service::<Already>()]
    }
}

#[tokio::test]
async fn existing_bindings_are_not_rebound() {
    let c = Container::with_context(ResolutionContext::new());
    c.register_with(&Already::token(), Binding::singleton().named("manual"), |_| Ok(Already));

    scan_modules(&c, &[&Decorated], ScanOptions::auto_bind(Lifetime::Singleton))
        .await
        .unwrap();

    assert_eq!(c.len(), 1);
    assert!(c.resolve_named(&Already::token(), "manual").is_ok());
}

#[tokio::test]
async fn decorated_exports_register_without_auto_bind() {
    let c = Container::with_context(ResolutionContext::new());
    scan_modules(&c, &[&Decorated], ScanOptions::default())
        .await
        .unwrap();

    let a = c.resolve(&Already::token()).unwrap();
    let b = c.resolve(&Already::token()).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

// =============================================================================
// Global registry
// =============================================================================

#[test]
fn global_registry_can_be_rebuilt() {
    let t = token::<u32>("module-scan-global");
    global().singleton(&t, |_| Ok(3));
    assert_eq!(*global().resolve(&t).unwrap(), 3);

    let fresh = reset_global();
    assert!(fresh.is_empty());
    assert!(global().resolve(&t).is_err());
}
