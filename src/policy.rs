//! Resolution policies
//!
//! A policy picks one registration among the candidates gathered for a
//! token. It is swappable per container via
//! [`Container::set_resolution_policy`](crate::Container::set_resolution_policy).

use crate::condition::holds;
use crate::factory::{DEFAULT_NAME, Registration};
use crate::token::Symbol;
use crate::ResolutionContext;
use std::sync::Arc;

/// Everything a policy may look at
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    /// The token being resolved
    pub token: Symbol,
    /// All variants found for the token, unfiltered, in discovery order
    pub candidates: &'a [Arc<Registration>],
    /// The requested variant name, if any
    pub requested_name: Option<&'a str>,
    /// Context of the container performing the resolution
    pub context: &'a ResolutionContext,
}

impl<'a> Selection<'a> {
    /// Candidates whose condition currently holds
    pub fn eligible(&self) -> impl Iterator<Item = &'a Arc<Registration>> + '_ {
        let context = self.context;
        self.candidates
            .iter()
            .filter(move |r| holds(r.condition(), context))
    }
}

/// Picks exactly one registration, or none when missing or ambiguous.
///
/// Implemented for any `Fn(&Selection) -> Option<Arc<Registration>>`.
///
/// # Examples
///
/// ```rust
/// use ioc_registry::{token, Binding, Container, Selection};
///
/// let n = token::<u32>("policy-doc-number");
/// let container = Container::new();
/// container.register_with(&n, Binding::singleton().named("a"), |_| Ok(1));
/// container.register_with(&n, Binding::singleton().named("b"), |_| Ok(2));
///
/// // Ambiguous under the default policy; "last registered wins" here
/// container.set_resolution_policy(|sel: &Selection<'_>| {
///     sel.eligible().max_by_key(|r| r.sequence()).cloned()
/// });
/// assert_eq!(*container.resolve(&n).unwrap(), 2);
/// ```
pub trait ResolutionPolicy: Send + Sync {
    /// Select one candidate
    fn select(&self, selection: &Selection<'_>) -> Option<Arc<Registration>>;
}

impl<F> ResolutionPolicy for F
where
    F: Fn(&Selection<'_>) -> Option<Arc<Registration>> + Send + Sync,
{
    #[inline]
    fn select(&self, selection: &Selection<'_>) -> Option<Arc<Registration>> {
        self(selection)
    }
}

/// The default policy.
///
/// 1. Drop candidates whose condition does not hold.
/// 2. With a requested name, the single candidate of that exact name.
/// 3. Otherwise the single `default`-qualified candidate.
/// 4. Otherwise the single remaining candidate.
/// 5. Anything else is ambiguous.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl ResolutionPolicy for DefaultPolicy {
    fn select(&self, selection: &Selection<'_>) -> Option<Arc<Registration>> {
        let eligible: Vec<&Arc<Registration>> = selection.eligible().collect();

        if let Some(requested) = selection.requested_name {
            return single(eligible.into_iter().filter(|r| r.name() == Some(requested)));
        }

        let is_default = |r: &&Arc<Registration>| r.qualifier() == DEFAULT_NAME;
        if eligible.iter().any(is_default) {
            single(eligible.into_iter().filter(is_default))
        } else {
            single(eligible.into_iter())
        }
    }
}

/// The only item, or `None` for zero or several
fn single<'a>(mut iter: impl Iterator<Item = &'a Arc<Registration>>) -> Option<Arc<Registration>> {
    let first = iter.next()?;
    match iter.next() {
        Some(_) => None,
        None => Some(Arc::clone(first)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Condition, Lifetime};

    fn reg(name: Option<&str>, condition: Option<Condition>) -> Arc<Registration> {
        Arc::new(Registration::new(
            Symbol::intern("policy-test"),
            Lifetime::Singleton,
            Registration::sync_producer(|_| Ok(())),
            name.map(Arc::from),
            condition,
        ))
    }

    fn select(
        candidates: &[Arc<Registration>],
        requested_name: Option<&str>,
        context: &ResolutionContext,
    ) -> Option<Arc<Registration>> {
        DefaultPolicy.select(&Selection {
            token: Symbol::intern("policy-test"),
            candidates,
            requested_name,
            context,
        })
    }

    #[test]
    fn test_prefers_default_variant() {
        let ctx = ResolutionContext::new();
        let candidates = [reg(Some("prod"), None), reg(None, None)];

        let picked = select(&candidates, None, &ctx).unwrap();
        assert_eq!(picked.qualifier(), "default");
    }

    #[test]
    fn test_requested_name_has_no_default_fallback() {
        let ctx = ResolutionContext::new();
        let candidates = [reg(None, None)];

        assert!(select(&candidates, Some("mock"), &ctx).is_none());
    }

    #[test]
    fn test_single_named_candidate_is_picked() {
        let ctx = ResolutionContext::new();
        let candidates = [reg(Some("only"), None)];

        let picked = select(&candidates, None, &ctx).unwrap();
        assert_eq!(picked.name(), Some("only"));
    }

    #[test]
    fn test_ambiguity() {
        let ctx = ResolutionContext::new();

        let two_named = [reg(Some("a"), None), reg(Some("b"), None)];
        assert!(select(&two_named, None, &ctx).is_none());
        assert!(select(&two_named, Some("a"), &ctx).is_some());

        let two_defaults = [reg(None, None), reg(None, None)];
        assert!(select(&two_defaults, None, &ctx).is_none());
    }

    #[test]
    fn test_conditions_filter_candidates() {
        let candidates = [
            reg(Some("mock"), Some(Condition::flag_eq("debug", true))),
            reg(None, None),
        ];

        let off = ResolutionContext::new();
        assert!(select(&candidates, Some("mock"), &off).is_none());

        let on = ResolutionContext::new().with_flag("debug", true);
        assert!(select(&candidates, Some("mock"), &on).is_some());
    }

    #[test]
    fn test_mutually_exclusive_same_name() {
        let candidates = [
            reg(Some("db"), Some(Condition::profile("prod"))),
            reg(Some("db"), Some(Condition::profile("dev"))),
        ];

        let dev = ResolutionContext::new().with_profile("dev");
        let picked = select(&candidates, Some("db"), &dev).unwrap();
        assert!(Arc::ptr_eq(&picked, &candidates[1]));
    }
}
