#![forbid(unsafe_code)]

//! Password field with a requirement checklist and a strength meter.
//!
//! # Rules
//!
//! | Key | Severity | Default |
//! |-----|----------|---------|
//! | `password.min_length` | error | 8 characters |
//! | `password.uppercase` | error | on |
//! | `password.lowercase` | error | on |
//! | `password.digit` | error | on |
//! | `password.special` | error | on |
//! | `password.common` | warning | small built-in list |
//! | `password.repeated` | warning | 3 in a row |
//! | `password.sequential` | warning | 3 in a row |
//! | `password.long` | info | 12+ characters |
//! | `password.confirm` | error | only with [`PasswordField::with_confirmation`] |
//!
//! # Strength
//!
//! [`PasswordField::strength`] is computed synchronously on every call and
//! does not wait for the debounce:
//!
//! - empty input is level 0;
//! - while requirements are missing, the level grows with the fraction met
//!   but stays below `max - 1`;
//! - once all are met, the level starts at `max` and drops by one for each
//!   point the score lost to warnings and once more if the password is not
//!   long. It never drops below 1.

use std::sync::{Arc, PoisonError, RwLock};

use fieldguard_core::config::ValidationConfig;
use fieldguard_core::field::{FieldValidator, Resolution, RetryError, ValidatorOutcome};
use fieldguard_core::i18n::{Translator, keys as message_keys};
use fieldguard_core::result::{MAX_SCORE, Severity};
use fieldguard_core::rules::{BuiltinRule, Rule, RuleSet, RuleSetError, RuleStatus, evaluate};
use fieldguard_core::sequencer::{AttemptId, ValidationRequest};
use fieldguard_core::state::{FieldSnapshot, ValidationStatus};
use fieldguard_core::telemetry::ValidationHooks;
use web_time::Instant;

/// Default minimum length.
pub const DEFAULT_MIN_LENGTH: usize = 8;
/// Length from which a password counts as long.
pub const LONG_PASSWORD_LENGTH: usize = 12;
/// Default top level of the strength meter.
pub const DEFAULT_MAX_STRENGTH: u8 = 4;

/// Passwords rejected by `password.common` unless a policy says otherwise.
pub const COMMON_PASSWORDS: &[&str] = &[
    "123456", "12345678", "123456789", "111111", "abc123", "admin", "baseball", "dragon",
    "football", "iloveyou", "letmein", "monkey", "password", "password1", "qwerty",
    "qwerty123", "sunshine", "welcome",
];

/// Rule keys used by [`PasswordField`].
pub mod keys {
    pub const MIN_LENGTH: &str = "password.min_length";
    pub const UPPERCASE: &str = "password.uppercase";
    pub const LOWERCASE: &str = "password.lowercase";
    pub const DIGIT: &str = "password.digit";
    pub const SPECIAL: &str = "password.special";
    pub const COMMON: &str = "password.common";
    pub const REPEATED: &str = "password.repeated";
    pub const SEQUENTIAL: &str = "password.sequential";
    pub const LONG: &str = "password.long";
    pub const CONFIRM: &str = "password.confirm";
}

/// Which requirements apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
    /// Values flagged by `password.common`, compared case-insensitively.
    pub common: Vec<String>,
    /// Top level of the strength meter (at least 1).
    pub max_strength: u8,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
            common: COMMON_PASSWORDS.iter().map(|s| (*s).to_owned()).collect(),
            max_strength: DEFAULT_MAX_STRENGTH,
        }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    #[must_use]
    pub fn with_uppercase(mut self, required: bool) -> Self {
        self.require_uppercase = required;
        self
    }

    #[must_use]
    pub fn with_lowercase(mut self, required: bool) -> Self {
        self.require_lowercase = required;
        self
    }

    #[must_use]
    pub fn with_digit(mut self, required: bool) -> Self {
        self.require_digit = required;
        self
    }

    #[must_use]
    pub fn with_special(mut self, required: bool) -> Self {
        self.require_special = required;
        self
    }

    /// Replace the list of common passwords.
    #[must_use]
    pub fn with_common<I, S>(mut self, common: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.common = common.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_max_strength(mut self, max_strength: u8) -> Self {
        self.max_strength = max_strength.max(1);
        self
    }

    /// Requirement, warning and suggestion rules, without confirmation.
    pub fn rules(&self) -> Result<RuleSet, RuleSetError> {
        let mut rules = RuleSet::new(vec![
            Rule::builtin(keys::MIN_LENGTH, BuiltinRule::MinLength(self.min_length)),
        ])?;
        let optional = [
            (self.require_uppercase, keys::UPPERCASE, BuiltinRule::HasUppercase),
            (self.require_lowercase, keys::LOWERCASE, BuiltinRule::HasLowercase),
            (self.require_digit, keys::DIGIT, BuiltinRule::HasDigit),
            (self.require_special, keys::SPECIAL, BuiltinRule::HasSpecial),
        ];
        for (enabled, key, rule) in optional {
            if enabled {
                rules.push(Rule::builtin(key, rule))?;
            }
        }
        if !self.common.is_empty() {
            rules.push(
                Rule::builtin(keys::COMMON, BuiltinRule::NotIn(self.common.clone()))
                    .with_message("This password is too common")
                    .warning(),
            )?;
        }
        rules.push(Rule::builtin(keys::REPEATED, BuiltinRule::NoRepeatedRun(3)).warning())?;
        rules.push(Rule::builtin(keys::SEQUENTIAL, BuiltinRule::NoSequentialRun(3)).warning())?;
        rules.push(
            Rule::builtin(keys::LONG, BuiltinRule::MinLength(LONG_PASSWORD_LENGTH))
                .with_label(format!("{LONG_PASSWORD_LENGTH} or more characters"))
                .with_message(format!(
                    "Use {LONG_PASSWORD_LENGTH} or more characters for a stronger password"
                ))
                .info(),
        )?;
        Ok(rules)
    }
}

/// Strength meter reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strength {
    /// `0..=max`.
    pub level: u8,
    pub max: u8,
    /// Translated label (`strength.0` .. `strength.4`).
    pub label: String,
}

impl Strength {
    /// Level as a fraction of the maximum.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        f32::from(self.level) / f32::from(self.max.max(1))
    }
}

fn strength_level(statuses: &[RuleStatus], score: u8, max: u8) -> u8 {
    let requirements: Vec<&RuleStatus> = statuses
        .iter()
        .filter(|s| s.severity == Severity::Error)
        .collect();
    let total = requirements.len();
    let met = requirements.iter().filter(|s| s.passed).count();

    if met < total {
        let below_top = usize::from(max.saturating_sub(1));
        return u8::try_from(met * below_top / total).unwrap_or(0);
    }

    let not_long = statuses
        .iter()
        .any(|s| s.key == keys::LONG && !s.passed);
    let penalty = (MAX_SCORE - score) + u8::from(not_long);
    max.saturating_sub(penalty).max(1)
}

/// A password input.
#[derive(Debug)]
pub struct PasswordField {
    policy: PasswordPolicy,
    requirements: RuleSet,
    confirmation: Option<Arc<RwLock<String>>>,
    field: FieldValidator,
}

impl PasswordField {
    pub fn new(
        label: impl Into<String>,
        policy: PasswordPolicy,
        config: ValidationConfig,
    ) -> Result<Self, RuleSetError> {
        Self::new_at(label, policy, config, Instant::now())
    }

    pub fn new_at(
        label: impl Into<String>,
        policy: PasswordPolicy,
        config: ValidationConfig,
        now: Instant,
    ) -> Result<Self, RuleSetError> {
        let field = FieldValidator::new_at(label, config, now).with_rules(policy.rules()?);
        let requirements = field.rules().clone();
        Ok(Self {
            policy,
            requirements,
            confirmation: None,
            field,
        })
    }

    /// Add the `password.confirm` rule, fed by [`PasswordField::confirm_at`].
    ///
    /// The rule applies even when the config narrows the active rules.
    pub fn with_confirmation(mut self) -> Result<Self, RuleSetError> {
        let confirmation = Arc::new(RwLock::new(String::new()));
        let expected = Arc::clone(&confirmation);
        let rule = Rule::custom(keys::CONFIRM, "Passwords match", move |value: &str| {
            *expected.read().unwrap_or_else(PoisonError::into_inner) == value
        })
        .with_message("Passwords do not match");
        self.field = self.field.with_rule(rule)?;
        self.confirmation = Some(confirmation);
        Ok(self)
    }

    #[must_use]
    pub fn with_external_validator(mut self, enabled: bool) -> Self {
        self.field = self.field.with_external_validator(enabled);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: ValidationHooks) -> Self {
        self.field = self.field.with_hooks(hooks);
        self
    }

    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.field = self.field.with_translator(translator);
        self
    }

    pub fn input_at(&mut self, value: impl Into<String>, now: Instant) {
        self.field.input_at(value, now);
    }

    pub fn input(&mut self, value: impl Into<String>) {
        self.field.input(value);
    }

    /// Update the confirmation value and revalidate the password.
    ///
    /// Cached results were computed against the old confirmation, so the
    /// cache is dropped. Without [`PasswordField::with_confirmation`] this
    /// does nothing.
    pub fn confirm_at(&mut self, confirmation: impl Into<String>, now: Instant) {
        let Some(slot) = &self.confirmation else {
            return;
        };
        *slot.write().unwrap_or_else(PoisonError::into_inner) = confirmation.into();
        let value = self.field.value().to_owned();
        self.field.reset_at(now);
        self.field.input_at(value, now);
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<ValidationRequest> {
        self.field.tick_at(now)
    }

    pub fn tick(&mut self) -> Option<ValidationRequest> {
        self.field.tick()
    }

    pub fn validate_now_at(&mut self, now: Instant) -> Option<ValidationRequest> {
        self.field.validate_now_at(now)
    }

    pub fn complete_at(
        &mut self,
        attempt: AttemptId,
        outcome: ValidatorOutcome,
        now: Instant,
    ) -> Resolution {
        self.field.complete_at(attempt, outcome, now)
    }

    pub fn retry_at(&mut self, now: Instant) -> Result<Option<ValidationRequest>, RetryError> {
        self.field.retry_at(now)
    }

    pub fn clear_at(&mut self, now: Instant) {
        self.field.clear_at(now);
    }

    pub fn clear(&mut self) {
        self.field.clear();
    }

    pub fn dispose(&mut self) {
        self.field.dispose();
    }

    /// Live requirement checklist for the current value.
    #[must_use]
    pub fn requirements(&self) -> Vec<RuleStatus> {
        evaluate(self.field.value(), &self.requirements)
            .statuses
            .into_iter()
            .filter(|s| s.severity == Severity::Error)
            .collect()
    }

    /// Strength of the current value.
    #[must_use]
    pub fn strength(&self) -> Strength {
        self.strength_of(self.field.value())
    }

    /// Strength of an arbitrary value under this field's policy.
    #[must_use]
    pub fn strength_of(&self, value: &str) -> Strength {
        let max = self.policy.max_strength.max(1);
        let level = if value.is_empty() {
            0
        } else {
            let report = evaluate(value, &self.requirements);
            strength_level(&report.statuses, report.score(), max)
        };
        let bucket = (u32::from(level) * 4 + u32::from(max) / 2) / u32::from(max);
        let key = format!("{}{bucket}", message_keys::STRENGTH_PREFIX);
        let label = self
            .field
            .translator()
            .translate_or_key(&key, &self.field.config().locale, &[]);
        Strength { level, max, label }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        self.field.value()
    }

    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        self.field.snapshot()
    }

    #[must_use]
    pub fn status(&self) -> ValidationStatus {
        self.field.status()
    }

    #[must_use]
    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    #[must_use]
    pub fn field(&self) -> &FieldValidator {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut FieldValidator {
        &mut self.field
    }
}
