//! Runtime resolution context
//!
//! Each container owns one [`ResolutionContext`]: an environment snapshot,
//! feature flags, an optional active profile and a clock. Conditions are
//! evaluated against it at resolve time.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// Clock returning milliseconds since the Unix epoch
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// A feature flag value
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Bool(bool),
    Str(String),
    Num(f64),
}

impl FlagValue {
    /// Truthiness: `false`, `""`, `0` and NaN are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Str(s) => !s.is_empty(),
            FlagValue::Num(n) => *n != 0.0 && !n.is_nan(),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Str(value.to_owned())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::Str(value)
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Num(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Num(value as f64)
    }
}

fn system_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Environment, flags, profile and clock used to evaluate conditions.
///
/// # Examples
///
/// ```rust
/// use ioc_registry::ResolutionContext;
///
/// let ctx = ResolutionContext::new()
///     .with_var("NODE_ENV", "production")
///     .with_flag("debug", true)
///     .with_profile("test");
///
/// assert_eq!(ctx.var("NODE_ENV"), Some("production"));
/// assert!(ctx.flag("debug").is_some_and(|f| f.is_truthy()));
/// assert_eq!(ctx.profile(), Some("test"));
/// ```
#[derive(Clone)]
pub struct ResolutionContext {
    pub env: HashMap<String, String>,
    pub flags: HashMap<String, FlagValue>,
    pub profile: Option<String>,
    pub clock: Clock,
}

impl ResolutionContext {
    /// Empty environment, no flags, no profile, system clock
    pub fn new() -> Self {
        Self {
            env: HashMap::new(),
            flags: HashMap::new(),
            profile: None,
            clock: Arc::new(system_clock),
        }
    }

    /// Context whose environment is a one-time snapshot of the process environment.
    ///
    /// Variables whose key or value is not valid Unicode are left out.
    pub fn from_env() -> Self {
        Self {
            env: unicode_vars(std::env::vars_os()),
            ..Self::new()
        }
    }

    /// Replace the environment snapshot
    pub fn with_env<I, K, V>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = env.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Set a single environment variable in the snapshot
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set a flag
    pub fn with_flag(mut self, key: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.flags.insert(key.into(), value.into());
        self
    }

    /// Set the active profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Replace the clock
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Look up an environment variable in the snapshot
    #[inline]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Look up a flag
    #[inline]
    pub fn flag(&self, key: &str) -> Option<&FlagValue> {
        self.flags.get(key)
    }

    /// The active profile
    #[inline]
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Current time in milliseconds, according to the context clock
    #[inline]
    pub fn now(&self) -> u64 {
        (self.clock)()
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("env_vars", &self.env.len())
            .field("flags", &self.flags)
            .field("profile", &self.profile)
            .finish()
    }
}

/// Live, shared handle to a container's context.
///
/// Reads and writes through this handle are seen by the next resolution on
/// the owning container. Child scopes get their own copy at creation time.
#[derive(Clone, Default)]
pub struct SharedContext {
    inner: Arc<RwLock<ResolutionContext>>,
}

impl SharedContext {
    pub(crate) fn new(context: ResolutionContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(context)),
        }
    }

    /// Borrow the context for reading
    pub fn read(&self) -> RwLockReadGuard<'_, ResolutionContext> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Borrow the context for mutation
    pub fn write(&self) -> RwLockWriteGuard<'_, ResolutionContext> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone the current state
    pub fn snapshot(&self) -> ResolutionContext {
        self.read().clone()
    }
}

impl fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read().fmt(f)
    }
}

fn unicode_vars<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_truthiness() {
        assert!(FlagValue::Bool(true).is_truthy());
        assert!(!FlagValue::Bool(false).is_truthy());
        assert!(!FlagValue::Str(String::new()).is_truthy());
        assert!(FlagValue::from("on").is_truthy());
        assert!(!FlagValue::Num(0.0).is_truthy());
        assert!(!FlagValue::Num(f64::NAN).is_truthy());
        assert!(FlagValue::from(3_i64).is_truthy());
    }

    #[test]
    fn test_with_env_replaces_snapshot() {
        let ctx = ResolutionContext::new()
            .with_var("A", "1")
            .with_env([("B", "2")]);
        assert_eq!(ctx.var("A"), None);
        assert_eq!(ctx.var("B"), Some("2"));
    }

    #[cfg(unix)]
    #[test]
    fn test_snapshot_skips_non_unicode_vars() {
        use std::os::unix::ffi::OsStringExt;

        let vars = [
            (OsString::from("GOOD"), OsString::from("1")),
            (OsString::from("BAD_VALUE"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from_vec(vec![0xff]), OsString::from("x")),
        ];
        let env = unicode_vars(vars);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("GOOD").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_custom_clock() {
        let ctx = ResolutionContext::new().with_clock(|| 42);
        assert_eq!(ctx.now(), 42);
    }

    #[test]
    fn test_shared_context_is_live() {
        let shared = SharedContext::new(ResolutionContext::new());
        let alias = shared.clone();
        alias.write().profile = Some("dev".into());
        assert_eq!(shared.read().profile(), Some("dev"));
    }
}
