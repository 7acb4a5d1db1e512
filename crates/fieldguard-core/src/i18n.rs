#![forbid(unsafe_code)]

//! Message lookup for announcements and rule messages.
//!
//! Fields never hold string tables of their own; they ask a [`Translator`]
//! for a key in the configured locale. [`Catalog`] is the stock translator:
//! per-locale [`LocaleStrings`], caller overrides, a fallback locale and
//! `{name}` interpolation.
//!
//! Lookup order for `Catalog::format(locale, key, params)`:
//!
//! 1. caller overrides
//! 2. the exact locale (`pt-BR`)
//! 3. the language of the locale (`pt`)
//! 4. the fallback locale
//! 5. the key itself

use std::collections::HashMap;
use std::env;

/// Built-in message keys.
pub mod keys {
    pub const VALIDATING: &str = "announce.validating";
    pub const VALID: &str = "announce.valid";
    pub const INVALID: &str = "announce.invalid";
    pub const ERROR: &str = "announce.error";
    pub const CLEARED: &str = "announce.cleared";
    pub const REQUIREMENTS: &str = "announce.requirements";
    pub const MISSING: &str = "announce.missing";
    pub const VALIDATION_FAILED: &str = "validation.failed";
    pub const INVALID_VALUE: &str = "validation.invalid";
    pub const STRENGTH_PREFIX: &str = "strength.";
}

/// A source of translated messages.
pub trait Translator: Send + Sync {
    /// Translate `key` for `locale`, substituting `{name}` placeholders.
    ///
    /// Returns `None` if the key is unknown.
    fn translate(&self, key: &str, locale: &str, params: &[(&str, &str)]) -> Option<String>;

    /// Like [`Translator::translate`] but falls back to the key itself.
    fn translate_or_key(&self, key: &str, locale: &str, params: &[(&str, &str)]) -> String {
        self.translate(key, locale, params)
            .unwrap_or_else(|| key.to_owned())
    }
}

/// Strings for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleStrings {
    entries: HashMap<String, String>,
}

impl LocaleStrings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a string.
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocaleStrings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut strings = Self::new();
        for (key, text) in iter {
            strings.insert(key, text);
        }
        strings
    }
}

/// Multi-locale string table with overrides and fallback.
#[derive(Debug, Clone)]
pub struct Catalog {
    locales: HashMap<String, LocaleStrings>,
    overrides: LocaleStrings,
    fallback_locale: String,
}

impl Default for Catalog {
    /// A catalog holding the built-in English strings, falling back to `en`.
    fn default() -> Self {
        let mut catalog = Self::new("en");
        catalog.add_locale("en", english());
        catalog
    }
}

impl Catalog {
    /// An empty catalog with the given fallback locale.
    #[must_use]
    pub fn new(fallback_locale: impl Into<String>) -> Self {
        Self {
            locales: HashMap::new(),
            overrides: LocaleStrings::new(),
            fallback_locale: fallback_locale.into(),
        }
    }

    /// Add (or replace) the strings of a locale.
    pub fn add_locale(&mut self, locale: impl Into<String>, strings: LocaleStrings) {
        self.locales.insert(locale.into(), strings);
    }

    /// Builder form of [`Catalog::add_locale`].
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>, strings: LocaleStrings) -> Self {
        self.add_locale(locale, strings);
        self
    }

    /// Caller overrides, consulted before any locale.
    #[must_use]
    pub fn with_overrides(mut self, overrides: LocaleStrings) -> Self {
        self.overrides = overrides;
        self
    }

    /// The locale consulted when the requested one has no entry.
    #[must_use]
    pub fn fallback_locale(&self) -> &str {
        &self.fallback_locale
    }

    /// Locales with at least one table.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }

    /// Raw lookup without interpolation.
    #[must_use]
    pub fn get(&self, locale: &str, key: &str) -> Option<&str> {
        if let Some(text) = self.overrides.get(key) {
            return Some(text);
        }
        let lookup = |tag: &str| self.locales.get(tag).and_then(|s| s.get(key));
        lookup(locale)
            .or_else(|| language_of(locale).and_then(lookup))
            .or_else(|| lookup(&self.fallback_locale))
    }

    /// Lookup with `{name}` interpolation; unknown keys yield the key.
    #[must_use]
    pub fn format(&self, locale: &str, key: &str, params: &[(&str, &str)]) -> String {
        match self.get(locale, key) {
            Some(template) => interpolate(template, params),
            None => key.to_owned(),
        }
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str, locale: &str, params: &[(&str, &str)]) -> Option<String> {
        self.get(locale, key).map(|t| interpolate(t, params))
    }
}

/// Substitute `{name}` placeholders. Unknown placeholders are left intact.
#[must_use]
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match params.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// The built-in English table.
#[must_use]
pub fn english() -> LocaleStrings {
    [
        (keys::VALIDATING, "Validating {field}"),
        (keys::VALID, "{field} is valid"),
        (keys::INVALID, "{field} is invalid: {error}"),
        (keys::ERROR, "{field} could not be validated"),
        (keys::CLEARED, "{field} cleared"),
        (keys::REQUIREMENTS, "{passed} of {total} requirements met"),
        (keys::MISSING, "Missing: {labels}"),
        (keys::VALIDATION_FAILED, "Validation failed"),
        (keys::INVALID_VALUE, "Invalid value"),
        ("strength.0", "Very weak"),
        ("strength.1", "Weak"),
        ("strength.2", "Fair"),
        ("strength.3", "Good"),
        ("strength.4", "Strong"),
    ]
    .into_iter()
    .collect()
}

fn language_of(locale: &str) -> Option<&str> {
    let (language, _) = locale.split_once('-')?;
    (!language.is_empty()).then_some(language)
}

/// Normalize a POSIX locale string (`en_US.UTF-8@euro`) to a tag (`en-US`).
///
/// `C` and `POSIX` map to `en`. Returns `None` for blank input.
#[must_use]
pub fn normalize_locale(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = raw.split('@').next().unwrap_or(raw);
    let raw = raw.split('.').next().unwrap_or(raw).trim();
    if raw.is_empty() {
        return None;
    }
    if raw.eq_ignore_ascii_case("c") || raw.eq_ignore_ascii_case("posix") {
        return Some("en".to_owned());
    }
    Some(raw.replace('_', "-"))
}

/// Locale from `LC_ALL`, then `LANG`, defaulting to `en`.
#[must_use]
pub fn detect_system_locale() -> String {
    let lc_all = env::var("LC_ALL").ok();
    let lang = env::var("LANG").ok();
    detect_locale_from(lc_all.as_deref(), lang.as_deref())
}

pub(crate) fn detect_locale_from(lc_all: Option<&str>, lang: Option<&str>) -> String {
    lc_all
        .and_then(normalize_locale)
        .or_else(|| lang.and_then(normalize_locale))
        .unwrap_or_else(|| "en".to_owned())
}
