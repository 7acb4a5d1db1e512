#![forbid(unsafe_code)]

//! Per-field validation configuration.
//!
//! A [`ValidationConfig`] is handed to a field at construction and never
//! mutated by it. Defaults can be overlaid from the environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `FIELDGUARD_DEBOUNCE_MS` | `debounce` | 300 |
//! | `FIELDGUARD_MAX_RETRIES` | `max_retries` | 3 |
//! | `FIELDGUARD_CACHE_CAPACITY` | `cache_capacity` | 100 |
//! | `FIELDGUARD_MEMOIZE` | `memoize` | `true` |
//! | `FIELDGUARD_ANNOUNCE_CLEAR_MS` | `announce_clear_after` | 1500 |
//! | `FIELDGUARD_LOCALE` (then `LC_ALL`, `LANG`) | `locale` | `en` |
//!
//! Values that fail to parse are ignored with a warning.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::announcer::{DEFAULT_CLEAR_AFTER, DEFAULT_SETTLE};
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::i18n::{detect_locale_from, normalize_locale};

/// Default quiet period before an attempt starts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default bound on explicit retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration of one field's validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Quiet period after the last input before validating.
    pub debounce: Duration,
    /// Explicit retries allowed before [`RetryError::Exhausted`](crate::field::RetryError).
    pub max_retries: u32,
    /// Result cache bound (0 disables the cache).
    pub cache_capacity: usize,
    /// Whether results are memoized by value.
    pub memoize: bool,
    /// When `false`, every input is ignored and the field stays idle.
    pub enabled: bool,
    /// Locale used for messages and announcements.
    pub locale: String,
    /// Rule keys to evaluate; `None` evaluates every rule.
    pub active_rules: Option<Vec<String>>,
    /// Live-region settle period.
    pub announce_settle: Duration,
    /// Live-region auto-clear delay.
    pub announce_clear_after: Duration,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            max_retries: DEFAULT_MAX_RETRIES,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            memoize: true,
            enabled: true,
            locale: "en".to_owned(),
            active_rules: None,
            announce_settle: DEFAULT_SETTLE,
            announce_clear_after: DEFAULT_CLEAR_AFTER,
        }
    }
}

impl ValidationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `FIELDGUARD_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = parse_var::<u64>(&lookup, "FIELDGUARD_DEBOUNCE_MS") {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var(&lookup, "FIELDGUARD_MAX_RETRIES") {
            config.max_retries = n;
        }
        if let Some(n) = parse_var(&lookup, "FIELDGUARD_CACHE_CAPACITY") {
            config.cache_capacity = n;
        }
        if let Some(raw) = lookup("FIELDGUARD_MEMOIZE") {
            match parse_flag(&raw) {
                Some(flag) => config.memoize = flag,
                None => warn_ignored("FIELDGUARD_MEMOIZE", &raw),
            }
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FIELDGUARD_ANNOUNCE_CLEAR_MS") {
            config.announce_clear_after = Duration::from_millis(ms);
        }
        config.locale = lookup("FIELDGUARD_LOCALE")
            .as_deref()
            .and_then(normalize_locale)
            .unwrap_or_else(|| {
                detect_locale_from(lookup("LC_ALL").as_deref(), lookup("LANG").as_deref())
            });
        config
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Restrict evaluation to the given rule keys.
    #[must_use]
    pub fn with_active_rules<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_rules = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_announce_timing(mut self, settle: Duration, clear_after: Duration) -> Self {
        self.announce_settle = settle;
        self.announce_clear_after = clear_after;
        self
    }

    /// Effective cache capacity (0 when memoization is off).
    #[must_use]
    pub fn effective_cache_capacity(&self) -> usize {
        if self.memoize { self.cache_capacity } else { 0 }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn_ignored(key, &raw);
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn warn_ignored(key: &str, raw: &str) {
    tracing::warn!(
        target: "fieldguard.config",
        key,
        value = raw,
        "ignoring unparseable environment value"
    );
}
