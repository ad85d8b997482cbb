//! Example demonstrating #[derive(Service)] and #[derive(Construct)]
//!
//! Run with:
//!   cargo run --example derive --features derive

use ioc_registry::{
    Binding, Construct, Container, Export, Lazy, Lifetime, Module, ScanOptions, Service,
    ServiceProvider, scan_modules, token,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct Driver {
    kind: &'static str,
}

#[derive(Service)]
struct Repository {
    id: u64,
}

#[derive(Service)]
#[service(lifetime = "transient")]
struct ServiceA {
    #[inject(name = "B")]
    driver: Arc<Driver>,
    #[inject]
    repo: Arc<Repository>,
}

impl ServiceA {
    fn greet(&self, who: &str, count: u32) -> String {
        format!("{who}#{count}@{}", self.driver.kind)
    }
}

#[derive(Service)]
#[service(token = "IServiceB")]
struct ServiceB {
    #[inject]
    repo: Arc<Repository>,
    #[inject(lazy, token = "RepoIdAsync")]
    lazy_id: Lazy<String>,
    #[inject(optional)]
    missing: Option<Arc<u64>>,
}

// Undecorated: only bound when the scan auto-binds
#[derive(Construct)]
struct Greeter {
    #[inject]
    repo: Arc<Repository>,
}

struct AppModule;

impl Module for AppModule {
    fn exports(&self) -> Vec<Export> {
        vec![Export::constructible::<Greeter>()]
    }
}

#[tokio::main]
async fn main() -> ioc_registry::Result<()> {
    let container = Container::new();

    let driver = token::<Driver>("Driver");
    container.register_with(&driver, Binding::singleton().named("A"), |_| {
        Ok(Driver { kind: "A" })
    });
    container.register_with(&driver, Binding::singleton().named("B"), |_| {
        Ok(Driver { kind: "B" })
    });
    container.register_async_with(
        &token::<String>("RepoIdAsync"),
        Binding::singleton(),
        |_| async { Ok(String::from("async-repo-id")) },
    );

    // #[derive(Service)] leaves non-injected fields to Default, so seed the id here
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    container.register_with(&Repository::token(), Repository::binding(), |_| {
        Ok(Repository {
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
        })
    });
    container.provide::<ServiceA>().provide::<ServiceB>();

    let a = container.resolve(&ServiceA::token())?;
    println!("ServiceA.greet: {}", a.greet("hello", 7));
    println!("ServiceA.repo: {}", a.repo.id);

    let b = container.resolve(&ServiceB::token())?;
    println!("ServiceB.repo: {}", b.repo.id);
    println!("ServiceB.lazy_id: {}", b.lazy_id.get_async().await?);
    println!("ServiceB.missing: {:?}", b.missing);

    scan_modules(&container, &[&AppModule], ScanOptions::auto_bind(Lifetime::Transient)).await?;
    let greeter = container.resolve(&Greeter::token())?;
    println!("Greeter.repo: {}", greeter.repo.id);

    Ok(())
}
