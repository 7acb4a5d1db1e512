#![forbid(unsafe_code)]

//! Synchronous rule engine.
//!
//! A [`RuleSet`] is an ordered list of [`Rule`]s resolved once at
//! construction. Each rule is either a [`BuiltinRule`] or a custom predicate.
//! [`evaluate`] runs every rule against a value, in declaration order, and
//! aggregates the failures into a [`RuleReport`]:
//!
//! - failures accumulate, they never short-circuit later rules;
//! - an error-severity failure makes the value invalid, warnings and infos
//!   are reported but keep it valid;
//! - a predicate that panics is logged and counted as a pass (fail-open), so
//!   one faulty custom rule cannot lock the user out.
//!
//! # Example
//!
//! ```
//! use fieldguard_core::rules::{BuiltinRule, Rule, RuleSet, evaluate};
//!
//! let rules = RuleSet::new(vec![
//!     Rule::builtin("min", BuiltinRule::MinLength(3)),
//!     Rule::custom("no-admin", "Not a reserved name", |v: &str| v != "admin")
//!         .with_message("That name is reserved"),
//! ])
//! .unwrap();
//!
//! let report = evaluate("admin", &rules);
//! assert!(!report.is_valid());
//! assert_eq!(report.errors, vec!["That name is reserved".to_string()]);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;
use web_time::Instant;

use crate::fault::contain;
use crate::result::{Severity, ValidationResult, score_for};

/// Stable key of the built-in required rule.
pub const RULE_KEY_REQUIRED: &str = "required";
/// Stable key of the built-in minimum length rule.
pub const RULE_KEY_MIN_LENGTH: &str = "too_short";
/// Stable key of the built-in maximum length rule.
pub const RULE_KEY_MAX_LENGTH: &str = "too_long";
/// Stable key of the built-in email rule.
pub const RULE_KEY_EMAIL: &str = "email";
/// Stable key of the built-in URL rule.
pub const RULE_KEY_URL: &str = "url";

// ---------------------------------------------------------------------------
// RuleOutcome
// ---------------------------------------------------------------------------

/// What a predicate returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The value satisfies the rule.
    Pass,
    /// The value fails; the rule's static message is used.
    Fail,
    /// The value fails with a dynamic message.
    FailWith(String),
}

impl RuleOutcome {
    /// Returns `true` for [`RuleOutcome::Pass`].
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl From<bool> for RuleOutcome {
    fn from(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }
}

impl From<String> for RuleOutcome {
    fn from(message: String) -> Self {
        Self::FailWith(message)
    }
}

impl From<&str> for RuleOutcome {
    fn from(message: &str) -> Self {
        Self::FailWith(message.to_owned())
    }
}

impl From<Option<String>> for RuleOutcome {
    /// `None` passes, `Some(message)` fails with that message.
    fn from(failure: Option<String>) -> Self {
        failure.map_or(Self::Pass, Self::FailWith)
    }
}

// ---------------------------------------------------------------------------
// BuiltinRule
// ---------------------------------------------------------------------------

/// Rules that ship with the engine.
///
/// Lengths count grapheme clusters, so "é" typed as `e` + combining accent
/// counts as one character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinRule {
    /// Not empty after trimming whitespace.
    Required,
    /// At least `n` characters.
    MinLength(usize),
    /// At most `n` characters.
    MaxLength(usize),
    /// Exactly `n` characters.
    ExactLength(usize),
    /// ASCII digits only.
    DigitsOnly,
    /// ASCII letters and digits only.
    Alphanumeric,
    /// At least one uppercase letter.
    HasUppercase,
    /// At least one lowercase letter.
    HasLowercase,
    /// At least one ASCII digit.
    HasDigit,
    /// At least one character that is neither alphanumeric nor whitespace.
    HasSpecial,
    /// No whitespace anywhere.
    NoWhitespace,
    /// No run of `n` identical characters (e.g. `aaa` for n=3).
    NoRepeatedRun(usize),
    /// No run of `n` consecutive ascending or descending characters
    /// (e.g. `123`, `cba` for n=3).
    NoSequentialRun(usize),
    /// Value is not in the list (case-insensitive).
    NotIn(Vec<String>),
    /// Heuristic email check: `local@domain.tld`.
    Email,
    /// Heuristic URL check: `http://` or `https://` prefix.
    Url {
        /// Accept only `https://`.
        require_https: bool,
    },
}

fn char_count(value: &str) -> usize {
    value.graphemes(true).count()
}

fn longest_run(chars: &[char], step: impl Fn(char, char) -> bool) -> usize {
    if chars.is_empty() {
        return 0;
    }
    let mut best = 1;
    let mut run = 1;
    for pair in chars.windows(2) {
        if step(pair[0], pair[1]) {
            run += 1;
            best = best.max(run);
        } else {
            run = 1;
        }
    }
    best
}

fn is_successor(a: char, b: char, delta: i64) -> bool {
    a.is_ascii_alphanumeric()
        && b.is_ascii_alphanumeric()
        && (a.is_ascii_digit() == b.is_ascii_digit())
        && i64::from(u32::from(b.to_ascii_lowercase())) - i64::from(u32::from(a.to_ascii_lowercase()))
            == delta
}

fn looks_like_email(value: &str) -> bool {
    let trimmed = value.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    if !domain.contains('.') {
        return false;
    }
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return false;
    }
    parts.last().is_some_and(|tld| tld.len() >= 2)
}

fn looks_like_url(value: &str, require_https: bool) -> bool {
    let trimmed = value.trim();
    let https = trimmed.len() > "https://".len() && trimmed.starts_with("https://");
    if require_https {
        https
    } else {
        https || (trimmed.len() > "http://".len() && trimmed.starts_with("http://"))
    }
}

impl BuiltinRule {
    /// Evaluate the rule.
    ///
    /// Format rules (`Email`, `Url`, `DigitsOnly`, `Alphanumeric`) accept the
    /// empty string; pair them with [`BuiltinRule::Required`] to demand a value.
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        match self {
            Self::Required => !value.trim().is_empty(),
            Self::MinLength(n) => char_count(value) >= *n,
            Self::MaxLength(n) => char_count(value) <= *n,
            Self::ExactLength(n) => char_count(value) == *n,
            Self::DigitsOnly => value.chars().all(|c| c.is_ascii_digit()),
            Self::Alphanumeric => value.chars().all(|c| c.is_ascii_alphanumeric()),
            Self::HasUppercase => value.chars().any(char::is_uppercase),
            Self::HasLowercase => value.chars().any(char::is_lowercase),
            Self::HasDigit => value.chars().any(|c| c.is_ascii_digit()),
            Self::HasSpecial => value
                .chars()
                .any(|c| !c.is_alphanumeric() && !c.is_whitespace()),
            Self::NoWhitespace => !value.chars().any(char::is_whitespace),
            Self::NoRepeatedRun(n) => {
                let chars: Vec<char> = value.chars().collect();
                *n < 2 || longest_run(&chars, |a, b| a == b) < *n
            }
            Self::NoSequentialRun(n) => {
                let chars: Vec<char> = value.chars().collect();
                *n < 2
                    || (longest_run(&chars, |a, b| is_successor(a, b, 1)) < *n
                        && longest_run(&chars, |a, b| is_successor(a, b, -1)) < *n)
            }
            Self::NotIn(list) => !list.iter().any(|item| item.eq_ignore_ascii_case(value)),
            Self::Email => value.trim().is_empty() || looks_like_email(value),
            Self::Url { require_https } => {
                value.trim().is_empty() || looks_like_url(value, *require_https)
            }
        }
    }

    /// Default label, phrased as a requirement.
    #[must_use]
    pub fn default_label(&self) -> String {
        match self {
            Self::Required => "A value is required".to_owned(),
            Self::MinLength(n) => format!("At least {n} characters"),
            Self::MaxLength(n) => format!("At most {n} characters"),
            Self::ExactLength(n) => format!("Exactly {n} characters"),
            Self::DigitsOnly => "Digits only".to_owned(),
            Self::Alphanumeric => "Letters and digits only".to_owned(),
            Self::HasUppercase => "One uppercase letter".to_owned(),
            Self::HasLowercase => "One lowercase letter".to_owned(),
            Self::HasDigit => "One number".to_owned(),
            Self::HasSpecial => "One special character".to_owned(),
            Self::NoWhitespace => "No spaces".to_owned(),
            Self::NoRepeatedRun(n) => format!("No character repeated {n} times in a row"),
            Self::NoSequentialRun(n) => format!("No sequence of {n} consecutive characters"),
            Self::NotIn(_) => "Not a commonly used value".to_owned(),
            Self::Email => "A valid email address".to_owned(),
            Self::Url { require_https: true } => "A valid HTTPS URL".to_owned(),
            Self::Url { .. } => "A valid URL".to_owned(),
        }
    }

    /// Default failure message.
    #[must_use]
    pub fn default_message(&self) -> String {
        match self {
            Self::Required => "This field is required".to_owned(),
            Self::MinLength(n) => format!("Must be at least {n} characters"),
            Self::MaxLength(n) => format!("Must be at most {n} characters"),
            Self::ExactLength(n) => format!("Must be exactly {n} characters"),
            Self::DigitsOnly => "Only digits are allowed".to_owned(),
            Self::Alphanumeric => "Only letters and digits are allowed".to_owned(),
            Self::HasUppercase => "Must contain an uppercase letter".to_owned(),
            Self::HasLowercase => "Must contain a lowercase letter".to_owned(),
            Self::HasDigit => "Must contain a number".to_owned(),
            Self::HasSpecial => "Must contain a special character".to_owned(),
            Self::NoWhitespace => "Must not contain spaces".to_owned(),
            Self::NoRepeatedRun(_) => "Avoid repeated characters".to_owned(),
            Self::NoSequentialRun(_) => "Avoid sequential characters".to_owned(),
            Self::NotIn(_) => "This value is too common".to_owned(),
            Self::Email => "Invalid email address".to_owned(),
            Self::Url { require_https: true } => "Invalid URL (must use HTTPS)".to_owned(),
            Self::Url { .. } => "Invalid URL".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A caller-supplied predicate.
pub type CustomCheck = Arc<dyn Fn(&str) -> RuleOutcome + Send + Sync>;

/// How a rule decides. Resolved once when the rule is built.
#[derive(Clone)]
pub enum RuleCheck {
    /// One of the engine's rules.
    Builtin(BuiltinRule),
    /// A caller-supplied predicate.
    Custom(CustomCheck),
}

impl fmt::Debug for RuleCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(rule) => f.debug_tuple("Builtin").field(rule).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One named check within a [`RuleSet`].
#[derive(Debug, Clone)]
pub struct Rule {
    key: String,
    label: String,
    message: String,
    severity: Severity,
    check: RuleCheck,
}

impl Rule {
    /// A rule backed by a built-in check, with its default label and message.
    #[must_use]
    pub fn builtin(key: impl Into<String>, rule: BuiltinRule) -> Self {
        Self {
            key: key.into(),
            label: rule.default_label(),
            message: rule.default_message(),
            severity: Severity::Error,
            check: RuleCheck::Builtin(rule),
        }
    }

    /// A rule backed by a custom predicate.
    ///
    /// The predicate may return `bool`, a failure message (`String`/`&str`),
    /// or a [`RuleOutcome`]. The label doubles as the failure message until
    /// [`Rule::with_message`] sets one.
    #[must_use]
    pub fn custom<F, O>(key: impl Into<String>, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> O + Send + Sync + 'static,
        O: Into<RuleOutcome>,
    {
        let label = label.into();
        Self {
            key: key.into(),
            message: label.clone(),
            label,
            severity: Severity::Error,
            check: RuleCheck::Custom(Arc::new(move |value| predicate(value).into())),
        }
    }

    /// Set the label shown in requirement lists and announcements.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the static failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Shorthand for warning severity.
    #[must_use]
    pub fn warning(self) -> Self {
        self.with_severity(Severity::Warning)
    }

    /// Shorthand for info severity.
    #[must_use]
    pub fn info(self) -> Self {
        self.with_severity(Severity::Info)
    }

    /// The rule's unique key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The rule's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The static failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The rule's severity.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// How the rule decides.
    #[must_use]
    pub fn check(&self) -> &RuleCheck {
        &self.check
    }

    /// Run the predicate. `Err` carries the panic message of a faulty
    /// custom predicate.
    fn run(&self, value: &str) -> Result<RuleOutcome, String> {
        match &self.check {
            RuleCheck::Builtin(rule) => Ok(rule.check(value).into()),
            RuleCheck::Custom(predicate) => contain(|| predicate(value)),
        }
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// Errors building a [`RuleSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSetError {
    /// Two rules share a key.
    DuplicateKey(String),
    /// A rule has an empty key.
    EmptyKey,
}

impl fmt::Display for RuleSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "duplicate rule key: {key}"),
            Self::EmptyKey => write!(f, "rule key must not be empty"),
        }
    }
}

impl std::error::Error for RuleSetError {}

/// Ordered rules with unique keys.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, rejecting empty or duplicate keys.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleSetError> {
        let mut set = Self::default();
        for rule in rules {
            set.push(rule)?;
        }
        Ok(set)
    }

    /// An empty rule set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a rule, rejecting empty or duplicate keys.
    pub fn push(&mut self, rule: Rule) -> Result<(), RuleSetError> {
        if rule.key.is_empty() {
            return Err(RuleSetError::EmptyKey);
        }
        if self.rules.iter().any(|r| r.key == rule.key) {
            return Err(RuleSetError::DuplicateKey(rule.key));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Builder form of [`RuleSet::push`].
    pub fn with(mut self, rule: Rule) -> Result<Self, RuleSetError> {
        self.push(rule)?;
        Ok(self)
    }

    /// Keep only the rules whose keys are listed. Declaration order is kept.
    #[must_use]
    pub fn only<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        let wanted: HashSet<&str> = keys.iter().map(AsRef::as_ref).collect();
        Self {
            rules: self
                .rules
                .iter()
                .filter(|rule| wanted.contains(rule.key.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Look up a rule by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.key == key)
    }

    /// Iterate rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Rule keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(Rule::key)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Per-rule outcome, for requirement checklists and announcements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleStatus {
    /// The rule's key.
    pub key: String,
    /// The rule's label.
    pub label: String,
    /// The rule's severity.
    pub severity: Severity,
    /// Whether the rule passed (faulty predicates count as passed).
    pub passed: bool,
    /// Whether the predicate panicked.
    pub faulted: bool,
}

/// Aggregated outcome of evaluating a [`RuleSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleReport {
    /// One status per rule, in declaration order.
    pub statuses: Vec<RuleStatus>,
    /// Messages of failed error-severity rules.
    pub errors: Vec<String>,
    /// Messages of failed warning-severity rules.
    pub warnings: Vec<String>,
    /// Messages of failed info-severity rules.
    pub suggestions: Vec<String>,
}

impl RuleReport {
    /// Valid iff no error-severity rule failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `max(0, 100 - 2*errors - warnings)`.
    #[must_use]
    pub fn score(&self) -> u8 {
        score_for(self.errors.len(), self.warnings.len())
    }

    /// Number of rules that passed.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.passed).count()
    }

    /// Number of predicates that panicked.
    #[must_use]
    pub fn fault_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.faulted).count()
    }

    /// Look up a rule's status by key.
    #[must_use]
    pub fn status(&self, key: &str) -> Option<&RuleStatus> {
        self.statuses.iter().find(|s| s.key == key)
    }

    /// Convert into an immutable [`ValidationResult`].
    #[must_use]
    pub fn into_result(self, validated_at: Instant) -> ValidationResult {
        ValidationResult::from_diagnostics(
            self.errors,
            self.warnings,
            self.suggestions,
            validated_at,
        )
    }
}

/// Evaluate every rule against `value`, in declaration order.
#[must_use]
pub fn evaluate(value: &str, rules: &RuleSet) -> RuleReport {
    let mut report = RuleReport {
        statuses: Vec::with_capacity(rules.len()),
        ..RuleReport::default()
    };

    for rule in rules.iter() {
        let (passed, faulted) = match rule.run(value) {
            Ok(RuleOutcome::Pass) => (true, false),
            Ok(outcome) => {
                let message = match outcome {
                    RuleOutcome::FailWith(message) => message,
                    _ => rule.message.clone(),
                };
                match rule.severity {
                    Severity::Error => report.errors.push(message),
                    Severity::Warning => report.warnings.push(message),
                    Severity::Info => report.suggestions.push(message),
                }
                (false, false)
            }
            Err(panic) => {
                tracing::warn!(
                    target: "fieldguard.rules",
                    rule = %rule.key,
                    panic = %panic,
                    "rule predicate panicked; treating as pass"
                );
                (true, true)
            }
        };
        report.statuses.push(RuleStatus {
            key: rule.key.clone(),
            label: rule.label.clone(),
            severity: rule.severity,
            passed,
            faulted,
        });
    }

    tracing::trace!(
        target: "fieldguard.rules",
        rules = rules.len(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "rules evaluated"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(rules: Vec<Rule>) -> RuleSet {
        RuleSet::new(rules).unwrap()
    }

    // -- BuiltinRule --

    #[test]
    fn required_rejects_blank() {
        assert!(!BuiltinRule::Required.check(""));
        assert!(!BuiltinRule::Required.check("   "));
        assert!(BuiltinRule::Required.check("x"));
    }

    #[test]
    fn lengths_count_graphemes() {
        // "e" + combining acute accent is one grapheme.
        let value = "cafe\u{301}";
        assert!(BuiltinRule::ExactLength(4).check(value));
        assert!(BuiltinRule::MinLength(4).check(value));
        assert!(!BuiltinRule::MaxLength(3).check(value));
    }

    #[test]
    fn character_classes() {
        assert!(BuiltinRule::DigitsOnly.check("0123"));
        assert!(!BuiltinRule::DigitsOnly.check("01a3"));
        assert!(BuiltinRule::Alphanumeric.check("A1b2"));
        assert!(!BuiltinRule::Alphanumeric.check("A1-b2"));
        assert!(BuiltinRule::HasUppercase.check("abC"));
        assert!(BuiltinRule::HasLowercase.check("ABc"));
        assert!(BuiltinRule::HasDigit.check("ab1"));
        assert!(BuiltinRule::HasSpecial.check("ab!"));
        assert!(!BuiltinRule::HasSpecial.check("ab c"));
        assert!(!BuiltinRule::NoWhitespace.check("a b"));
    }

    #[test]
    fn repeated_runs() {
        assert!(!BuiltinRule::NoRepeatedRun(3).check("paaass"));
        assert!(BuiltinRule::NoRepeatedRun(3).check("paass"));
        assert!(!BuiltinRule::NoRepeatedRun(6).check("111111"));
    }

    #[test]
    fn sequential_runs() {
        assert!(!BuiltinRule::NoSequentialRun(3).check("x123y"));
        assert!(!BuiltinRule::NoSequentialRun(3).check("CBA"));
        assert!(!BuiltinRule::NoSequentialRun(4).check("abCD"));
        assert!(BuiltinRule::NoSequentialRun(3).check("1357"));
        // Digits and letters do not chain ('9' -> ':' is not a sequence).
        assert!(BuiltinRule::NoSequentialRun(3).check("89a"));
    }

    #[test]
    fn not_in_is_case_insensitive() {
        let rule = BuiltinRule::NotIn(vec!["password".into(), "qwerty".into()]);
        assert!(!rule.check("PassWord"));
        assert!(rule.check("passw0rd!"));
    }

    #[test]
    fn email_heuristics() {
        assert!(BuiltinRule::Email.check("user@example.com"));
        assert!(BuiltinRule::Email.check(""));
        assert!(!BuiltinRule::Email.check("user@example"));
        assert!(!BuiltinRule::Email.check("@example.com"));
        assert!(!BuiltinRule::Email.check("user@example.c"));
        assert!(!BuiltinRule::Email.check("user@@example.com"));
        assert!(!BuiltinRule::Email.check("user@example..com"));
    }

    #[test]
    fn url_heuristics() {
        let any = BuiltinRule::Url {
            require_https: false,
        };
        let https = BuiltinRule::Url {
            require_https: true,
        };
        assert!(any.check("http://x.io"));
        assert!(any.check("https://x.io"));
        assert!(!any.check("http://"));
        assert!(!any.check("ftp://x.io"));
        assert!(!https.check("http://x.io"));
        assert!(https.check("https://x.io"));
    }

    // -- RuleSet --

    #[test]
    fn duplicate_keys_rejected() {
        let err = RuleSet::new(vec![
            Rule::builtin("a", BuiltinRule::Required),
            Rule::builtin("a", BuiltinRule::HasDigit),
        ])
        .unwrap_err();
        assert_eq!(err, RuleSetError::DuplicateKey("a".into()));
        assert_eq!(err.to_string(), "duplicate rule key: a");
    }

    #[test]
    fn empty_key_rejected() {
        let err = RuleSet::empty()
            .with(Rule::builtin("", BuiltinRule::Required))
            .unwrap_err();
        assert_eq!(err, RuleSetError::EmptyKey);
    }

    #[test]
    fn only_keeps_declaration_order() {
        let rules = set(vec![
            Rule::builtin("a", BuiltinRule::Required),
            Rule::builtin("b", BuiltinRule::HasDigit),
            Rule::builtin("c", BuiltinRule::HasUppercase),
        ]);
        let active = rules.only(&["c", "a"]);
        assert_eq!(active.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    // -- evaluate --

    #[test]
    fn failures_accumulate_in_order() {
        let rules = set(vec![
            Rule::builtin("len", BuiltinRule::MinLength(8)),
            Rule::builtin("upper", BuiltinRule::HasUppercase),
            Rule::builtin("digit", BuiltinRule::HasDigit),
        ]);
        let report = evaluate("abc", &rules);
        assert_eq!(
            report.errors,
            vec![
                "Must be at least 8 characters".to_string(),
                "Must contain an uppercase letter".to_string(),
                "Must contain a number".to_string(),
            ]
        );
        assert_eq!(report.passed_count(), 0);
        assert_eq!(report.statuses.len(), 3);
    }

    #[test]
    fn severities_route_to_lists() {
        let rules = set(vec![
            Rule::builtin("len", BuiltinRule::MinLength(8)),
            Rule::builtin("upper", BuiltinRule::HasUppercase),
            Rule::builtin("repeat", BuiltinRule::NoRepeatedRun(3)).warning(),
            Rule::custom("long", "Use 12+ characters", |v: &str| v.len() >= 12).info(),
        ]);
        let report = evaluate("aaab", &rules);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.warnings, vec!["Avoid repeated characters".to_string()]);
        assert_eq!(report.suggestions, vec!["Use 12+ characters".to_string()]);
        assert_eq!(report.score(), 95);
        assert!(!report.is_valid());
    }

    #[test]
    fn dynamic_message_from_predicate() {
        let rules = set(vec![Rule::custom("max", "Short enough", |v: &str| {
            if v.len() > 3 {
                RuleOutcome::FailWith(format!("{} characters over", v.len() - 3))
            } else {
                RuleOutcome::Pass
            }
        })]);
        let report = evaluate("abcdef", &rules);
        assert_eq!(report.errors, vec!["3 characters over".to_string()]);
    }

    #[test]
    fn option_predicate_maps_to_outcome() {
        let rules = set(vec![Rule::custom("x", "No x", |v: &str| {
            v.contains('x').then(|| "x is not allowed".to_string())
        })]);
        assert!(evaluate("abc", &rules).is_valid());
        assert_eq!(evaluate("xyz", &rules).errors, vec!["x is not allowed".to_string()]);
    }

    #[test]
    fn panicking_predicate_fails_open() {
        let rules = set(vec![
            Rule::custom("boom", "Never panics", |_: &str| -> bool {
                panic!("bad custom rule")
            }),
            Rule::builtin("digit", BuiltinRule::HasDigit),
        ]);
        let report = evaluate("abc", &rules);

        // The faulty rule passes; the later rule still runs and fails.
        let boom = report.status("boom").unwrap();
        assert!(boom.passed);
        assert!(boom.faulted);
        assert_eq!(report.fault_count(), 1);
        assert_eq!(report.errors, vec!["Must contain a number".to_string()]);
    }

    #[test]
    fn into_result_carries_score_and_message() {
        let rules = set(vec![
            Rule::builtin("req", BuiltinRule::Required),
            Rule::builtin("ws", BuiltinRule::NoWhitespace).warning(),
        ]);
        let now = Instant::now();
        let result = evaluate(" ", &rules).into_result(now);
        assert!(!result.is_valid);
        assert_eq!(result.message, "This field is required");
        assert_eq!(result.score, 97);
        assert_eq!(result.validated_at, now);
    }

    #[test]
    fn empty_rule_set_is_valid() {
        let report = evaluate("anything", &RuleSet::empty());
        assert!(report.is_valid());
        assert_eq!(report.score(), 100);
    }
}
