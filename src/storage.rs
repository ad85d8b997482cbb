//! Registration storage for a single scope
//!
//! Uses DashMap for lock-free concurrent access. Registrations are grouped
//! per token into `token::name` variant lists that keep discovery order:
//! groups in order of their first registration, then registration order
//! within each group.

use crate::factory::Registration;
use crate::token::Symbol;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

/// All variants of one token in one scope
#[derive(Default)]
struct VariantTable {
    groups: Vec<(Arc<str>, Vec<Arc<Registration>>)>,
}

impl VariantTable {
    fn push(&mut self, registration: Arc<Registration>) {
        let qualifier = registration.qualifier();
        match self
            .groups
            .iter_mut()
            .find(|(name, _)| name.as_ref() == qualifier)
        {
            Some((_, list)) => list.push(registration),
            None => {
                let name: Arc<str> = Arc::from(qualifier);
                self.groups.push((name, vec![registration]));
            }
        }
    }

    fn flatten(&self) -> Vec<Arc<Registration>> {
        self.groups
            .iter()
            .flat_map(|(_, list)| list.iter().cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.groups.iter().map(|(_, list)| list.len()).sum()
    }
}

/// Thread-safe storage for registrations of one scope.
///
/// Uses `DashMap` with `ahash`. Never deduplicates: every registration is
/// appended to its `token::name` list.
pub(crate) struct RegistrationStorage {
    tokens: DashMap<Symbol, VariantTable, RandomState>,
}

impl RegistrationStorage {
    /// Create new empty storage.
    ///
    /// Uses 8 shards: registries hold few tokens and scopes are created often.
    #[inline]
    pub fn new() -> Self {
        Self {
            tokens: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Append a registration under its `token::name` key
    #[inline]
    pub fn insert(&self, registration: Arc<Registration>) {
        self.tokens
            .entry(registration.symbol())
            .or_default()
            .push(registration);
    }

    /// Every variant of `symbol` in discovery order.
    ///
    /// The shard lock is released before returning, so callers may run
    /// factories that register into this same storage.
    #[inline]
    pub fn variants(&self, symbol: Symbol) -> Vec<Arc<Registration>> {
        self.tokens
            .get(&symbol)
            .map(|table| table.flatten())
            .unwrap_or_default()
    }

    /// Whether any variant (any name) exists for `symbol`
    #[inline]
    pub fn contains(&self, symbol: Symbol) -> bool {
        self.tokens
            .get(&symbol)
            .is_some_and(|table| !table.groups.is_empty())
    }

    /// Number of registrations across all tokens
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.iter().map(|table| table.len()).sum()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Every token with at least one registration
    pub fn symbols(&self) -> Vec<Symbol> {
        self.tokens.iter().map(|r| *r.key()).collect()
    }
}

impl Default for RegistrationStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegistrationStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationStorage")
            .field("tokens", &self.tokens.len())
            .field("registrations", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lifetime;

    fn reg(symbol: Symbol, name: Option<&str>) -> Arc<Registration> {
        Arc::new(Registration::new(
            symbol,
            Lifetime::Transient,
            Registration::sync_producer(|_| Ok(())),
            name.map(Arc::from),
            None,
        ))
    }

    #[test]
    fn test_storage_keeps_discovery_order() {
        let storage = RegistrationStorage::new();
        let symbol = Symbol::intern("storage-test-order");

        storage.insert(reg(symbol, Some("b")));
        storage.insert(reg(symbol, None));
        storage.insert(reg(symbol, Some("b")));
        storage.insert(reg(symbol, Some("default")));

        let names: Vec<_> = storage
            .variants(symbol)
            .iter()
            .map(|r| r.qualifier().to_owned())
            .collect();
        assert_eq!(names, ["b", "b", "default", "default"]);
        assert_eq!(storage.len(), 4);
    }

    #[test]
    fn test_storage_contains() {
        let storage = RegistrationStorage::new();
        let symbol = Symbol::intern("storage-test-contains");

        assert!(!storage.contains(symbol));
        assert!(storage.variants(symbol).is_empty());

        storage.insert(reg(symbol, Some("x")));

        assert!(storage.contains(symbol));
        assert_eq!(storage.symbols(), vec![symbol]);
    }
}
