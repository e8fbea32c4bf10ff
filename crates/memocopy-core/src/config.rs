//! Engine configuration
//!
//! A [`CopyConfig`] is fixed when an [`crate::Engine`] is built. The
//! process-wide engine reads its configuration once from `MEMOCOPY_*`
//! environment variables:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `MEMOCOPY_NO_MEMO_FALLBACK` | non-empty: hooks rejecting the native memo fail instead of being retried |
//! | `MEMOCOPY_NO_MEMO_FALLBACK_WARNING` | `*` silences fallback diagnostics; otherwise `::`-separated error texts to silence |
//! | `MEMOCOPY_USE_DICT_MEMO` | non-empty: start every call with a default-shaped memo |
//! | `MEMOCOPY_FALLBACK_SCOPE` | `per_call` (default) or `per_invocation` |
//! | `MEMOCOPY_RECURSION_LIMIT` | advisory depth limit |
//! | `MEMOCOPY_STACK_BUDGET_KIB` | stack the descent may use, in KiB |

use serde::Deserialize;
use thiserror::Error;

use crate::guard::RecursionLimits;

/// Prefix of every environment variable the engine reads
pub const ENV_PREFIX: &str = "MEMOCOPY";

pub const DEFAULT_RECURSION_LIMIT: usize = 100_000;

/// Fits within the 2 MiB default stack of spawned threads
pub const DEFAULT_STACK_BUDGET: usize = 1024 * 1024;

/// How long the memo fallback stays engaged once triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackScope {
    /// Later hooks in the same top-level call get the default-shaped memo
    /// straight away
    #[default]
    PerCall,
    /// Every hook invocation tries the native memo first
    PerInvocation,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Engine behaviour switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyConfig {
    /// Retry hooks that reject the native memo with a default-shaped one
    pub memo_fallback: bool,
    /// Emit a diagnostic when the fallback engages
    pub warn_on_fallback: bool,
    /// Error texts whose fallback diagnostics are silenced (suffix match)
    pub ignored_errors: Vec<String>,
    /// Start every call with a default-shaped memo
    pub use_dict_memo: bool,
    pub fallback_scope: FallbackScope,
    /// Advisory depth limit
    pub recursion_limit: usize,
    /// Stack the descent may use below its outermost entry, in bytes
    pub stack_budget: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            memo_fallback: true,
            warn_on_fallback: true,
            ignored_errors: Vec::new(),
            use_dict_memo: false,
            fallback_scope: FallbackScope::default(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            stack_budget: DEFAULT_STACK_BUDGET,
        }
    }
}

impl CopyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memo_fallback(mut self, enabled: bool) -> Self {
        self.memo_fallback = enabled;
        self
    }

    pub fn with_fallback_warning(mut self, enabled: bool) -> Self {
        self.warn_on_fallback = enabled;
        self
    }

    /// Silence fallback diagnostics whose error text ends with `text`
    pub fn ignore_error(mut self, text: impl Into<String>) -> Self {
        self.ignored_errors.push(text.into());
        self
    }

    pub fn with_dict_memo(mut self, enabled: bool) -> Self {
        self.use_dict_memo = enabled;
        self
    }

    pub fn with_fallback_scope(mut self, scope: FallbackScope) -> Self {
        self.fallback_scope = scope;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_stack_budget(mut self, bytes: usize) -> Self {
        self.stack_budget = bytes;
        self
    }

    /// Read configuration from `MEMOCOPY_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable holds an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Read configuration from an explicit environment source
    ///
    /// Tests use this with `Environment::source` to avoid touching the real
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable holds an unparsable value.
    pub fn from_environment(environment: config::Environment) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(environment)
            .build()?;
        let raw: EnvSettings = settings.try_deserialize()?;
        raw.into_config()
    }

    /// Whether a fallback diagnostic for `identifier` should be emitted
    pub fn should_warn(&self, identifier: &str) -> bool {
        self.warn_on_fallback
            && !self
                .ignored_errors
                .iter()
                .any(|text| identifier.ends_with(text.as_str()))
    }

    pub(crate) fn recursion_limits(&self) -> RecursionLimits {
        RecursionLimits {
            limit: self.recursion_limit,
            stack_budget: self.stack_budget,
        }
    }
}

/// Raw variables after prefix stripping; all optional strings
#[derive(Debug, Default, Deserialize)]
struct EnvSettings {
    no_memo_fallback: Option<String>,
    no_memo_fallback_warning: Option<String>,
    use_dict_memo: Option<String>,
    fallback_scope: Option<String>,
    recursion_limit: Option<String>,
    stack_budget_kib: Option<String>,
}

impl EnvSettings {
    fn into_config(self) -> Result<CopyConfig, ConfigError> {
        let mut config = CopyConfig {
            memo_fallback: !is_set(&self.no_memo_fallback),
            use_dict_memo: is_set(&self.use_dict_memo),
            ..CopyConfig::default()
        };

        match self.no_memo_fallback_warning.as_deref() {
            None | Some("") => {}
            Some("*") => config.warn_on_fallback = false,
            Some(list) => {
                config.ignored_errors = list
                    .split("::")
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }

        if let Some(scope) = non_empty(self.fallback_scope) {
            config.fallback_scope = match scope.to_ascii_lowercase().as_str() {
                "per_call" | "call" => FallbackScope::PerCall,
                "per_invocation" | "invocation" => FallbackScope::PerInvocation,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "MEMOCOPY_FALLBACK_SCOPE",
                        value: scope,
                    })
                }
            };
        }

        if let Some(limit) = non_empty(self.recursion_limit) {
            config.recursion_limit = parse_positive("MEMOCOPY_RECURSION_LIMIT", limit)?;
        }

        if let Some(kib) = non_empty(self.stack_budget_kib) {
            let kib = parse_positive("MEMOCOPY_STACK_BUDGET_KIB", kib)?;
            config.stack_budget = kib.saturating_mul(1024);
        }

        Ok(config)
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_positive(key: &'static str, value: String) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}
