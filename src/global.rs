//! The process-wide default container.
//!
//! Created on first access. Prefer passing a [`Container`] explicitly; this
//! exists for code that cannot. Tests can call [`reset_global`] to start
//! from an empty registry.

use crate::Container;
use once_cell::sync::Lazy;
use std::sync::{PoisonError, RwLock};

#[cfg(feature = "logging")]
use tracing::debug;

static GLOBAL_CONTAINER: Lazy<RwLock<Container>> = Lazy::new(|| RwLock::new(Container::new()));

/// A handle to the global container.
///
/// The handle stays valid after [`reset_global`], but refers to the
/// registry that was current when it was obtained.
///
/// # Examples
///
/// ```
/// use ioc_registry::{global, token};
///
/// let greeting = token::<String>("global-doc-greeting");
/// global().singleton(&greeting, |_| Ok("Hello from global!".to_string()));
/// assert!(global().contains(&greeting));
/// ```
pub fn global() -> Container {
    GLOBAL_CONTAINER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replace the global container with a fresh one and return it.
pub fn reset_global() -> Container {
    let fresh = Container::new();
    *GLOBAL_CONTAINER
        .write()
        .unwrap_or_else(PoisonError::into_inner) = fresh.clone();

    #[cfg(feature = "logging")]
    debug!(target: "ioc_registry", "Global container reset");

    fresh
}
