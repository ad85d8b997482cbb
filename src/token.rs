//! Interned service tokens
//!
//! A [`Token<T>`] is an opaque identifier for a capability. Identity comes
//! from the interned descriptor string only; the payload type `T` is a
//! compile-time association and is checked again at downcast time.

use crate::Injectable;
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide descriptor interner
static INTERNER: Lazy<DashMap<&'static str, Symbol, RandomState>> =
    Lazy::new(|| DashMap::with_hasher(RandomState::new()));

static NEXT_SYMBOL: AtomicU32 = AtomicU32::new(0);

/// Type-erased, interned token identity.
///
/// Two symbols are equal iff they were interned from the same descriptor.
#[derive(Clone, Copy)]
pub struct Symbol {
    id: u32,
    description: &'static str,
}

impl Symbol {
    /// Intern a descriptor, returning the same symbol for the same string
    /// for the lifetime of the process.
    pub fn intern(description: &str) -> Self {
        if let Some(existing) = INTERNER.get(description) {
            return *existing;
        }

        let leaked: &'static str = Box::leak(description.to_owned().into_boxed_str());
        *INTERNER.entry(leaked).or_insert_with(|| Symbol {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: leaked,
        })
    }

    /// The descriptor this symbol was interned from
    #[inline]
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Dense process-local id
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl PartialEq for Symbol {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

/// A typed handle to an interned [`Symbol`].
///
/// # Examples
///
/// ```rust
/// use ioc_registry::token;
///
/// struct Logger;
///
/// let a = token::<Logger>("ILogger");
/// let b = token::<Logger>("ILogger");
/// assert_eq!(a, b);
/// assert_eq!(a.description(), "ILogger");
/// ```
pub struct Token<T> {
    symbol: Symbol,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Token<T> {
    /// Intern `description` and tag it with the payload type `T`
    #[inline]
    pub fn new(description: &str) -> Self {
        Self::from_symbol(Symbol::intern(description))
    }

    /// Token named after the short type name of `T` (`my_crate::Db` -> `Db`)
    #[inline]
    pub fn of_type() -> Self {
        Self::new(short_type_name::<T>())
    }

    /// Re-type an existing symbol
    #[inline]
    pub fn from_symbol(symbol: Symbol) -> Self {
        Self {
            symbol,
            _marker: PhantomData,
        }
    }
}

impl<T> Token<T> {
    /// The untyped identity
    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// The descriptor string
    #[inline]
    pub fn description(&self) -> &'static str {
        self.symbol.description
    }
}

impl<T> Clone for Token<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Token<T> {}

impl<T> PartialEq for Token<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl<T> Eq for Token<T> {}

impl<T> Hash for Token<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl<T> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("description", &self.symbol.description)
            .field("payload", &std::any::type_name::<T>())
            .finish()
    }
}

/// Create (or look up) the token for `description`.
///
/// Calling this twice with the same description yields equal tokens.
#[inline]
pub fn token<T: Injectable>(description: &str) -> Token<T> {
    Token::new(description)
}

/// Last path segment of `type_name::<T>()`, generics kept intact.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base_end = full.find('<').unwrap_or(full.len());
    let start = full[..base_end].rfind("::").map(|i| i + 2).unwrap_or(0);
    &full[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;

    #[test]
    fn test_interning_is_stable() {
        let a = Symbol::intern("token-test-db");
        let b = Symbol::intern("token-test-db");
        let c = Symbol::intern("token-test-cache");

        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
        assert_ne!(a, c);
        assert!(std::ptr::eq(a.description(), b.description()));
    }

    #[test]
    fn test_token_identity_ignores_payload() {
        let a = token::<u32>("token-test-shared");
        let b = token::<String>("token-test-shared");
        assert_eq!(a.symbol(), b.symbol());
    }

    #[test]
    fn test_of_type_uses_short_name() {
        let t = Token::<Database>::of_type();
        assert_eq!(t.description(), "Database");
        assert_eq!(short_type_name::<Vec<u8>>(), "Vec<u8>");
    }
}
