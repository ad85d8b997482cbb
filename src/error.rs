//! Error types for registration and resolution

use thiserror::Error;

/// Errors that can occur while resolving services from a [`Container`](crate::Container).
///
/// Every variant is raised at the call site that detected it and propagates
/// unchanged to the original caller; the container never retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// No registration, or more than one with no tie-break, survived selection
    #[error("DI: ambiguous or missing {token} [{}]", display_name(.name))]
    MissingOrAmbiguous {
        token: &'static str,
        name: Option<String>,
    },

    /// A synchronous resolve hit a registration holding an async factory
    #[error("DI: {token} is async, use resolve_async()")]
    WrongResolutionMode { token: &'static str },

    /// `resolve_all` met an async-only registration
    #[error("resolve_all: async binding present for {token}, use resolve_all_async()")]
    AsyncBindingPresent { token: &'static str },

    /// A factory re-entered resolution of its own registration before completing
    #[error("Circular dependency detected for {token} [{}]", display_name(.name))]
    CircularDependency {
        token: &'static str,
        name: Option<String>,
    },

    /// A synchronous lazy accessor observed an asynchronous producer
    #[error("Attempted sync resolve of async dependency: {label}")]
    SyncOnAsyncProducer { label: &'static str },

    /// The cached or produced instance is not of the type the token promised
    #[error("Type mismatch for {token}: expected {expected}")]
    TypeMismatch {
        token: &'static str,
        expected: &'static str,
    },

    /// Factory failed to create service
    #[error("Failed to create {token}: {reason}")]
    CreationFailed { token: &'static str, reason: String },

    /// Parent scope was dropped
    #[error("Parent scope has been dropped")]
    ParentDropped,
}

fn display_name(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("auto")
}

impl DiError {
    /// Create a MissingOrAmbiguous error
    #[inline]
    pub fn missing(token: &'static str, name: Option<&str>) -> Self {
        Self::MissingOrAmbiguous {
            token,
            name: name.map(str::to_owned),
        }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(token: &'static str, name: Option<&str>) -> Self {
        Self::CircularDependency {
            token,
            name: name.map(str::to_owned),
        }
    }

    /// Create a TypeMismatch error for the payload type `T`
    #[inline]
    pub fn type_mismatch<T: 'static>(token: &'static str) -> Self {
        Self::TypeMismatch {
            token,
            expected: std::any::type_name::<T>(),
        }
    }

    /// Create a CreationFailed error
    ///
    /// Factories use this to report domain failures:
    ///
    /// ```rust
    /// use ioc_registry::{token, Container, DiError};
    ///
    /// let port = token::<u16>("port");
    /// let container = Container::new();
    /// container.register(&port, |c| {
    ///     let raw = c.context().read().var("APP_PORT").unwrap_or("8080").to_owned();
    ///     raw.parse().map_err(|e| DiError::creation_failed("port", format!("{e}")))
    /// });
    /// ```
    #[inline]
    pub fn creation_failed(token: &'static str, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            token,
            reason: reason.into(),
        }
    }

    /// True for the selection failure raised when no unique candidate exists
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingOrAmbiguous { .. })
    }

    /// True for a detected dependency cycle
    #[inline]
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
