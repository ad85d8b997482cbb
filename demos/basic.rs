//! Basic container usage: tokens, lifetimes, named variants, conditional
//! and async bindings, child scopes.
//!
//! Run with:
//!   cargo run --example basic

use ioc_registry::{Binding, Container, Result, token};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger {
    prefix: &'static str,
}

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[{}] {msg}", self.prefix);
    }
}

trait Repo: Send + Sync {
    fn count(&self) -> u64;
}

struct CountingRepo {
    counter: Arc<AtomicU64>,
}

impl Repo for CountingRepo {
    fn count(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

struct FixedRepo;

impl Repo for FixedRepo {
    fn count(&self) -> u64 {
        1000
    }
}

trait Payment: Send + Sync {
    fn pay(&self, amount: u32) -> String;
}

struct MockPayment;

impl Payment for MockPayment {
    fn pay(&self, amount: u32) -> String {
        format!("MOCK:{amount}")
    }
}

struct LivePayment;

impl Payment for LivePayment {
    fn pay(&self, amount: u32) -> String {
        format!("LIVE:{amount}")
    }
}

struct Data {
    ts: u128,
}

#[tokio::main]
async fn main() -> Result<()> {
    let container = Container::new();

    // Tokens
    let logger = token::<Box<dyn Logger>>("ILogger");
    let repo = token::<Box<dyn Repo>>("IRepo");
    let payment = token::<Box<dyn Payment>>("IPayment");
    let data = token::<Data>("IData");

    // Singleton logger
    container.singleton(&logger, |_| {
        Ok(Box::new(ConsoleLogger { prefix: "log" }) as Box<dyn Logger>)
    });

    // Transient repository plus a named singleton variant
    let counter = Arc::new(AtomicU64::new(0));
    container.transient(&repo, move |_| {
        Ok(Box::new(CountingRepo {
            counter: Arc::clone(&counter),
        }) as Box<dyn Repo>)
    });
    container.register_with(&repo, Binding::singleton().named("fixed"), |_| {
        Ok(Box::new(FixedRepo) as Box<dyn Repo>)
    });

    // Conditional binding on a flag
    container.set_flag("debug", true);
    container.when_flag(&payment, "debug", true, Binding::singleton().named("mock"), |_| {
        Ok(Box::new(MockPayment) as Box<dyn Payment>)
    });
    container.singleton(&payment, |_| Ok(Box::new(LivePayment) as Box<dyn Payment>));

    // Async binding
    container.register_async_with(&data, Binding::singleton(), |_| async {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Ok(Data { ts })
    });

    let log = container.resolve(&logger)?;
    log.log("hello container");

    let repo_a = container.resolve(&repo)?;
    let repo_b = container.resolve(&repo)?;
    log.log(&format!(
        "transient repo counts: {} then {}",
        repo_a.count(),
        repo_b.count()
    ));

    let fixed = container.resolve_named(&repo, "fixed")?;
    log.log(&format!("named repo (fixed): {}", fixed.count()));

    let mock = container.resolve_named(&payment, "mock")?;
    log.log(&mock.pay(42));

    let live = container.resolve(&payment)?;
    log.log(&live.pay(42));

    let stamp = container.resolve_async(&data).await?;
    log.log(&format!("async data ts={}", stamp.ts));

    // Child scope overrides the logger without touching the parent
    let child = container.create_scope();
    child.singleton(&logger, |_| {
        Ok(Box::new(ConsoleLogger { prefix: "child" }) as Box<dyn Logger>)
    });
    child.resolve(&logger)?.log("scoped logger in action");
    container.resolve(&logger)?.log("parent logger unchanged");

    Ok(())
}
