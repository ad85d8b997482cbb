//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use ioc_registry::{Binding, Container, token};

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct RequestContext {
    request_id: String,
}

fn main() {
    // JSON with logging-json, pretty with logging-pretty; TRACE shows cache hits
    ioc_registry::logging::builder().trace().registry_only().init();

    println!("=== ioc-registry Logging Demo ===\n");

    let db = token::<Database>("Database");
    let request = token::<RequestContext>("RequestContext");

    // logs: "Creating new root container"
    let container = Container::new();

    // logs: "Registering service"
    container.singleton(&db, |_| {
        println!("  [App] Database being created...");
        Ok(Database {
            url: "postgres://localhost/mydb".into(),
        })
    });

    println!("\n--- Resolving services ---\n");

    // first resolve runs the factory, second hits the cache
    let _ = container.resolve(&db);
    let _ = container.resolve(&db);

    println!("\n--- Missing and ambiguous tokens ---\n");

    // logs: "Token not registered in container or parent chain"
    if let Err(e) = container.resolve(&request) {
        println!("  [App] {e}");
    }

    container.register_with(&request, Binding::scoped().named("a"), |_| {
        Ok(RequestContext {
            request_id: "a".into(),
        })
    });
    container.register_with(&request, Binding::scoped().named("b"), |_| {
        Ok(RequestContext {
            request_id: "b".into(),
        })
    });

    // logs: "No unique registration selected"
    if let Err(e) = container.resolve(&request) {
        println!("  [App] {e}");
    }

    println!("\n--- Child scopes ---\n");

    // logs: "Creating child scope from parent container"
    let child = container.create_scope();

    // logs: "No local variants, delegating to parent scope"
    let _ = child.resolve(&db);
    let _ = child.resolve_named(&request, "a");

    println!("\n=== Demo Complete ===");
}
