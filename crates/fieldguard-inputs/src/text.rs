#![forbid(unsafe_code)]

//! General-purpose text field.
//!
//! [`TextField`] is a [`FieldValidator`] configured from [`TextOptions`]:
//! required, length bounds, a [`TextKind`] format check and any custom
//! rules, evaluated in that order. An external validator (for example a
//! uniqueness lookup) runs only when those rules pass. A field may also
//! remember recently committed values through [`RecentValues`].

use std::sync::Arc;

use fieldguard_core::config::ValidationConfig;
use fieldguard_core::field::{FieldValidator, Resolution, RetryError, ValidatorOutcome};
use fieldguard_core::i18n::Translator;
use fieldguard_core::rules::{
    BuiltinRule, RULE_KEY_EMAIL, RULE_KEY_MAX_LENGTH, RULE_KEY_MIN_LENGTH, RULE_KEY_REQUIRED,
    RULE_KEY_URL, Rule, RuleSet, RuleSetError,
};
use fieldguard_core::sequencer::{AttemptId, ValidationRequest};
use fieldguard_core::state::{FieldSnapshot, ValidationStatus};
use fieldguard_core::telemetry::ValidationHooks;
use web_time::Instant;

use crate::recent::RecentValues;

/// Stable key of the digits format rule.
pub const RULE_KEY_DIGITS: &str = "digits";

/// Expected format of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextKind {
    #[default]
    Plain,
    Email,
    Url {
        require_https: bool,
    },
    Digits,
}

impl TextKind {
    fn rule(self) -> Option<Rule> {
        match self {
            Self::Plain => None,
            Self::Email => Some(Rule::builtin(RULE_KEY_EMAIL, BuiltinRule::Email)),
            Self::Url { require_https } => Some(Rule::builtin(
                RULE_KEY_URL,
                BuiltinRule::Url { require_https },
            )),
            Self::Digits => Some(Rule::builtin(RULE_KEY_DIGITS, BuiltinRule::DigitsOnly)),
        }
    }
}

/// Rules of a [`TextField`].
#[derive(Debug, Clone, Default)]
pub struct TextOptions {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub kind: TextKind,
    /// Evaluated after the built-in rules, in order.
    pub rules: Vec<Rule>,
}

impl TextOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: TextKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Build the rule set; fails if a custom rule reuses a key.
    pub fn rules(&self) -> Result<RuleSet, RuleSetError> {
        let mut rules = RuleSet::empty();
        if self.required {
            rules.push(Rule::builtin(RULE_KEY_REQUIRED, BuiltinRule::Required))?;
        }
        if let Some(min) = self.min_length {
            rules.push(Rule::builtin(RULE_KEY_MIN_LENGTH, BuiltinRule::MinLength(min)))?;
        }
        if let Some(max) = self.max_length {
            rules.push(Rule::builtin(RULE_KEY_MAX_LENGTH, BuiltinRule::MaxLength(max)))?;
        }
        if let Some(rule) = self.kind.rule() {
            rules.push(rule)?;
        }
        for rule in &self.rules {
            rules.push(rule.clone())?;
        }
        Ok(rules)
    }
}

/// A text input.
#[derive(Debug)]
pub struct TextField {
    kind: TextKind,
    field: FieldValidator,
    recent: Option<RecentValues>,
}

impl TextField {
    pub fn new(
        label: impl Into<String>,
        options: TextOptions,
        config: ValidationConfig,
    ) -> Result<Self, RuleSetError> {
        Self::new_at(label, options, config, Instant::now())
    }

    pub fn new_at(
        label: impl Into<String>,
        options: TextOptions,
        config: ValidationConfig,
        now: Instant,
    ) -> Result<Self, RuleSetError> {
        let rules = options.rules()?;
        Ok(Self {
            kind: options.kind,
            field: FieldValidator::new_at(label, config, now).with_rules(rules),
            recent: None,
        })
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

    /// Remember committed values.
    #[must_use]
    pub fn with_recent(mut self, recent: RecentValues) -> Self {
        self.recent = Some(recent);
        self
    }

    pub fn input_at(&mut self, value: impl Into<String>, now: Instant) {
        self.field.input_at(value, now);
    }

    pub fn input(&mut self, value: impl Into<String>) {
        self.field.input(value);
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

    pub fn validate_now(&mut self) -> Option<ValidationRequest> {
        self.field.validate_now()
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

    pub fn reset_at(&mut self, now: Instant) {
        self.field.reset_at(now);
    }

    pub fn dispose(&mut self) {
        self.field.dispose();
    }

    /// Record the current value in the recent list if it is valid.
    ///
    /// Returns `true` if the list changed.
    pub fn commit(&mut self) -> bool {
        if self.field.status() != ValidationStatus::Valid {
            return false;
        }
        let value = self.field.value().to_owned();
        self.recent
            .as_mut()
            .is_some_and(|recent| recent.record(value))
    }

    /// Recent values starting with the current input.
    #[must_use]
    pub fn recent_suggestions(&self) -> Vec<&str> {
        self.recent
            .as_ref()
            .map(|recent| recent.matching(self.field.value()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn recent(&self) -> Option<&RecentValues> {
        self.recent.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> TextKind {
        self.kind
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
    pub fn field(&self) -> &FieldValidator {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut FieldValidator {
        &mut self.field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldguard_core::persistence::MemoryPersistence;
    use fieldguard_core::result::ValidatorVerdict;
    use std::time::Duration;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn text(options: TextOptions, t0: Instant) -> TextField {
        TextField::new_at("Email", options, ValidationConfig::default(), t0).unwrap()
    }

    #[test]
    fn rules_follow_declaration_order() {
        let options = TextOptions::new()
            .required()
            .with_min_length(3)
            .with_max_length(10)
            .with_kind(TextKind::Email)
            .with_rule(Rule::custom("corp", "Company address", |v: &str| {
                v.ends_with("@corp.example")
            }));
        let keys: Vec<String> = options
            .rules()
            .unwrap()
            .keys()
            .map(str::to_owned)
            .collect();
        assert_eq!(
            keys,
            vec!["required", "too_short", "too_long", "email", "corp"]
        );
    }

    #[test]
    fn duplicate_custom_key_is_rejected() {
        let options = TextOptions::new()
            .required()
            .with_rule(Rule::custom("required", "Again", |_: &str| true));
        assert_eq!(
            TextField::new("Name", options, ValidationConfig::default()).err(),
            Some(RuleSetError::DuplicateKey("required".into()))
        );
    }

    #[test]
    fn email_kind_flags_bad_address() {
        let t0 = Instant::now();
        let mut field = text(TextOptions::new().with_kind(TextKind::Email), t0);
        field.input_at("not-an-email", t0);
        field.tick_at(t0 + DEBOUNCE);
        assert_eq!(field.status(), ValidationStatus::Invalid);
        assert_eq!(field.snapshot().error.as_deref(), Some("Invalid email address"));
    }

    #[test]
    fn whitespace_fails_required() {
        let t0 = Instant::now();
        let mut field = text(TextOptions::new().required(), t0);
        field.input_at("   ", t0);
        field.tick_at(t0 + DEBOUNCE);
        assert_eq!(
            field.snapshot().error.as_deref(),
            Some("This field is required")
        );
    }

    #[test]
    fn external_validator_runs_after_rules_pass() {
        let t0 = Instant::now();
        let mut field =
            text(TextOptions::new().with_kind(TextKind::Email), t0).with_external_validator(true);
        field.input_at("bad", t0);
        assert!(field.tick_at(t0 + DEBOUNCE).is_none());

        let t1 = t0 + DEBOUNCE * 2;
        field.input_at("taken@example.com", t1);
        let request = field.tick_at(t1 + DEBOUNCE).unwrap();
        field.complete_at(
            request.attempt,
            Ok(ValidatorVerdict::invalid("Address already registered")),
            t1 + DEBOUNCE,
        );
        assert_eq!(
            field.snapshot().error.as_deref(),
            Some("Address already registered")
        );
    }

    #[test]
    fn commit_records_only_valid_values() {
        let t0 = Instant::now();
        let storage = Arc::new(MemoryPersistence::new());
        let mut field = text(TextOptions::new().with_kind(TextKind::Email), t0)
            .with_recent(RecentValues::new(storage.clone()));

        field.input_at("nope", t0);
        field.tick_at(t0 + DEBOUNCE);
        assert!(!field.commit());

        let t1 = t0 + DEBOUNCE * 2;
        field.input_at("ann@example.com", t1);
        field.tick_at(t1 + DEBOUNCE);
        assert!(field.commit());
        assert_eq!(storage.values(), vec!["ann@example.com"]);

        field.input_at("an", t1 + DEBOUNCE * 2);
        assert_eq!(field.recent_suggestions(), vec!["ann@example.com"]);
    }

    #[test]
    fn commit_without_recent_list_is_noop() {
        let t0 = Instant::now();
        let mut field = text(TextOptions::new(), t0);
        field.input_at("hello", t0);
        field.tick_at(t0 + DEBOUNCE);
        assert_eq!(field.status(), ValidationStatus::Valid);
        assert!(!field.commit());
        assert!(field.recent_suggestions().is_empty());
    }
}
