//! Registration conditions
//!
//! A [`Condition`] gates whether a registration is eligible during a given
//! resolution. Absent conditions always hold.

use crate::{FlagValue, ResolutionContext};
use std::fmt;
use std::sync::Arc;

/// Arbitrary predicate over the resolution context
pub type Predicate = Arc<dyn Fn(&ResolutionContext) -> bool + Send + Sync>;

/// How an environment variable is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvCheck {
    /// Variable equals the value
    Equals(String),
    /// Variable differs from the value (an unset variable differs)
    NotEquals(String),
    /// Variable is set and non-empty
    Present,
}

/// A gate over environment, flags, profile or a custom predicate.
#[derive(Clone)]
pub enum Condition {
    /// Environment variable check
    Env { key: String, check: EnvCheck },
    /// Flag check; `expected: None` tests truthiness
    Flag { key: String, expected: Option<bool> },
    /// Active profile equals the name
    Profile(String),
    /// Custom predicate
    Predicate(Predicate),
}

impl Condition {
    /// `env[key] == value`
    pub fn env_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::Env {
            key: key.into(),
            check: EnvCheck::Equals(value.into()),
        }
    }

    /// `env[key] != value`
    pub fn env_not_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::Env {
            key: key.into(),
            check: EnvCheck::NotEquals(value.into()),
        }
    }

    /// `env[key]` is set and non-empty
    pub fn env_present(key: impl Into<String>) -> Self {
        Condition::Env {
            key: key.into(),
            check: EnvCheck::Present,
        }
    }

    /// Flag is truthy
    pub fn flag(key: impl Into<String>) -> Self {
        Condition::Flag {
            key: key.into(),
            expected: None,
        }
    }

    /// Flag is exactly the boolean `expected`
    pub fn flag_eq(key: impl Into<String>, expected: bool) -> Self {
        Condition::Flag {
            key: key.into(),
            expected: Some(expected),
        }
    }

    /// Active profile is `name`
    pub fn profile(name: impl Into<String>) -> Self {
        Condition::Profile(name.into())
    }

    /// Custom predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&ResolutionContext) -> bool + Send + Sync + 'static,
    {
        Condition::Predicate(Arc::new(f))
    }

    /// Evaluate against `ctx`
    pub fn holds(&self, ctx: &ResolutionContext) -> bool {
        match self {
            Condition::Env { key, check } => {
                let value = ctx.var(key);
                match check {
                    EnvCheck::Present => value.is_some_and(|v| !v.is_empty()),
                    EnvCheck::Equals(expected) => value == Some(expected.as_str()),
                    EnvCheck::NotEquals(unexpected) => value != Some(unexpected.as_str()),
                }
            }
            Condition::Flag { key, expected } => {
                let value = ctx.flag(key);
                match expected {
                    None => value.is_some_and(FlagValue::is_truthy),
                    Some(expected) => matches!(value, Some(FlagValue::Bool(b)) if b == expected),
                }
            }
            Condition::Profile(name) => ctx.profile() == Some(name.as_str()),
            Condition::Predicate(f) => f(ctx),
        }
    }
}

/// `None` always holds
#[inline]
pub(crate) fn holds(condition: Option<&Condition>, ctx: &ResolutionContext) -> bool {
    condition.is_none_or(|c| c.holds(ctx))
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Env { key, check } => f
                .debug_struct("Env")
                .field("key", key)
                .field("check", check)
                .finish(),
            Condition::Flag { key, expected } => f
                .debug_struct("Flag")
                .field("key", key)
                .field("expected", expected)
                .finish(),
            Condition::Profile(name) => f.debug_tuple("Profile").field(name).finish(),
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ResolutionContext {
        ResolutionContext::new()
            .with_var("NODE_ENV", "production")
            .with_var("EMPTY", "")
            .with_flag("debug", true)
            .with_flag("level", "verbose")
    }

    #[test]
    fn test_env_checks() {
        let ctx = ctx();
        assert!(Condition::env_equals("NODE_ENV", "production").holds(&ctx));
        assert!(!Condition::env_equals("NODE_ENV", "development").holds(&ctx));
        assert!(Condition::env_not_equals("NODE_ENV", "development").holds(&ctx));
        assert!(Condition::env_not_equals("MISSING", "x").holds(&ctx));
        assert!(Condition::env_present("NODE_ENV").holds(&ctx));
        assert!(!Condition::env_present("EMPTY").holds(&ctx));
        assert!(!Condition::env_present("MISSING").holds(&ctx));
    }

    #[test]
    fn test_flag_checks() {
        let ctx = ctx();
        assert!(Condition::flag("debug").holds(&ctx));
        assert!(Condition::flag_eq("debug", true).holds(&ctx));
        assert!(!Condition::flag_eq("debug", false).holds(&ctx));
        assert!(Condition::flag("level").holds(&ctx));
        // a string flag is never equal to a boolean
        assert!(!Condition::flag_eq("level", true).holds(&ctx));
        assert!(!Condition::flag("missing").holds(&ctx));
    }

    #[test]
    fn test_profile_and_predicate() {
        let ctx = ctx().with_profile("test");
        assert!(Condition::profile("test").holds(&ctx));
        assert!(!Condition::profile("prod").holds(&ctx));
        assert!(Condition::predicate(|c| c.flags.len() == 2).holds(&ctx));
        assert!(holds(None, &ctx));
    }
}
