#![forbid(unsafe_code)]

//! One-time-code field.
//!
//! [`OtpField`] accepts typed or pasted input, keeps only characters the
//! configured [`OtpCharset`] allows (upper-casing letters) and truncates to
//! the code length. Validation runs through a [`FieldValidator`] with these
//! rules:
//!
//! | Key | Severity | Check |
//! |-----|----------|-------|
//! | `otp.length` | error | exactly `length` characters |
//! | `otp.charset` | error | digits, or letters and digits |
//! | `otp.repeated` | warning (opt-in) | no character three times in a row |
//! | `otp.sequential` | warning (opt-in) | no run like `123` or `cba` |
//!
//! A complete code skips the rest of the debounce window when
//! [`OtpOptions::auto_submit`] is set. Verification against a server is the
//! external validator; [`OtpField::retry_at`] re-verifies and is bounded by
//! the configured `max_retries`.

use std::sync::Arc;

use fieldguard_core::config::ValidationConfig;
use fieldguard_core::field::{FieldValidator, Resolution, RetryError, ValidatorOutcome};
use fieldguard_core::i18n::Translator;
use fieldguard_core::rules::{BuiltinRule, Rule, RuleSet, RuleSetError};
use fieldguard_core::sequencer::{AttemptId, ValidationRequest};
use fieldguard_core::state::{FieldSnapshot, ValidationStatus};
use fieldguard_core::telemetry::ValidationHooks;
use web_time::Instant;

/// Default code length.
pub const DEFAULT_OTP_LENGTH: usize = 6;

/// Rule keys used by [`OtpField`].
pub mod keys {
    pub const LENGTH: &str = "otp.length";
    pub const CHARSET: &str = "otp.charset";
    pub const REPEATED: &str = "otp.repeated";
    pub const SEQUENTIAL: &str = "otp.sequential";
}

/// Characters a code may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OtpCharset {
    /// ASCII digits.
    #[default]
    Numeric,
    /// ASCII letters and digits; letters are upper-cased.
    Alphanumeric,
}

impl OtpCharset {
    /// Whether `c` is allowed, before normalization.
    #[must_use]
    pub fn allows(self, c: char) -> bool {
        match self {
            Self::Numeric => c.is_ascii_digit(),
            Self::Alphanumeric => c.is_ascii_alphanumeric(),
        }
    }

    fn rule(self) -> Rule {
        match self {
            Self::Numeric => Rule::builtin(keys::CHARSET, BuiltinRule::DigitsOnly),
            Self::Alphanumeric => Rule::builtin(keys::CHARSET, BuiltinRule::Alphanumeric),
        }
    }
}

/// Keep the allowed characters of `input`, upper-cased, up to `length`.
///
/// ```
/// use fieldguard_inputs::otp::{OtpCharset, sanitize};
///
/// assert_eq!(sanitize("12-34 56 78", 6, OtpCharset::Numeric), "123456");
/// assert_eq!(sanitize("ab c1", 6, OtpCharset::Alphanumeric), "ABC1");
/// ```
#[must_use]
pub fn sanitize(input: &str, length: usize, charset: OtpCharset) -> String {
    input
        .chars()
        .filter(|&c| charset.allows(c))
        .map(|c| c.to_ascii_uppercase())
        .take(length)
        .collect()
}

/// Shape of the code and which optional checks run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpOptions {
    /// Number of characters.
    pub length: usize,
    /// Allowed characters.
    pub charset: OtpCharset,
    /// Warn on a character repeated three times in a row.
    pub warn_repeated: bool,
    /// Warn on three consecutive ascending or descending characters.
    pub warn_sequential: bool,
    /// Validate as soon as the code is complete.
    pub auto_submit: bool,
}

impl Default for OtpOptions {
    fn default() -> Self {
        Self {
            length: DEFAULT_OTP_LENGTH,
            charset: OtpCharset::Numeric,
            warn_repeated: false,
            warn_sequential: false,
            auto_submit: true,
        }
    }
}

impl OtpOptions {
    #[must_use]
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: OtpCharset) -> Self {
        self.charset = charset;
        self
    }

    /// Enable the `otp.repeated` and `otp.sequential` warnings.
    #[must_use]
    pub fn with_pattern_warnings(mut self, enabled: bool) -> Self {
        self.warn_repeated = enabled;
        self.warn_sequential = enabled;
        self
    }

    #[must_use]
    pub fn with_auto_submit(mut self, enabled: bool) -> Self {
        self.auto_submit = enabled;
        self
    }

    /// The rule set these options describe.
    pub fn rules(&self) -> Result<RuleSet, RuleSetError> {
        let length = self.length;
        let mut rules = RuleSet::new(vec![
            Rule::builtin(keys::LENGTH, BuiltinRule::ExactLength(length))
                .with_label(format!("{length} characters"))
                .with_message(format!("Enter all {length} characters")),
            self.charset.rule(),
        ])?;
        if self.warn_repeated {
            rules.push(
                Rule::builtin(keys::REPEATED, BuiltinRule::NoRepeatedRun(3))
                    .with_message("Code repeats the same character")
                    .warning(),
            )?;
        }
        if self.warn_sequential {
            rules.push(
                Rule::builtin(keys::SEQUENTIAL, BuiltinRule::NoSequentialRun(3))
                    .with_message("Code contains a sequence")
                    .warning(),
            )?;
        }
        Ok(rules)
    }
}

/// A one-time-code input.
#[derive(Debug)]
pub struct OtpField {
    options: OtpOptions,
    field: FieldValidator,
}

impl OtpField {
    /// Create a field verified by rules only.
    pub fn new(
        label: impl Into<String>,
        options: OtpOptions,
        config: ValidationConfig,
    ) -> Result<Self, RuleSetError> {
        Self::new_at(label, options, config, Instant::now())
    }

    pub fn new_at(
        label: impl Into<String>,
        options: OtpOptions,
        config: ValidationConfig,
        now: Instant,
    ) -> Result<Self, RuleSetError> {
        let rules = options.rules()?;
        let field = FieldValidator::new_at(label, config, now).with_rules(rules);
        Ok(Self { options, field })
    }

    /// Verify complete codes with an external validator (a server check).
    #[must_use]
    pub fn with_verifier(mut self, enabled: bool) -> Self {
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

    /// Replace the code with sanitized `raw` input.
    ///
    /// Returns a request when a complete code was auto-submitted to the
    /// verifier.
    pub fn input_at(&mut self, raw: &str, now: Instant) -> Option<ValidationRequest> {
        let code = sanitize(raw, self.options.length, self.options.charset);
        let complete = self.is_complete_code(&code);
        self.field.input_at(code, now);
        if complete && self.options.auto_submit {
            self.field.validate_now_at(now)
        } else {
            None
        }
    }

    pub fn input(&mut self, raw: &str) -> Option<ValidationRequest> {
        self.input_at(raw, Instant::now())
    }

    /// Paste `raw` and validate at once, complete or not.
    pub fn paste_at(&mut self, raw: &str, now: Instant) -> Option<ValidationRequest> {
        let code = sanitize(raw, self.options.length, self.options.charset);
        tracing::debug!(
            target: "fieldguard.field",
            pasted = raw.chars().count(),
            kept = code.len(),
            "otp paste"
        );
        self.field.input_at(code, now);
        self.field.validate_now_at(now)
    }

    pub fn paste(&mut self, raw: &str) -> Option<ValidationRequest> {
        self.paste_at(raw, Instant::now())
    }

    /// Append one typed character. Disallowed characters and input past
    /// the code length are ignored.
    pub fn push_char_at(&mut self, c: char, now: Instant) -> Option<ValidationRequest> {
        if !self.options.charset.allows(c) || self.is_complete() {
            return None;
        }
        let mut raw = self.field.value().to_owned();
        raw.push(c);
        self.input_at(&raw, now)
    }

    /// Remove the last character.
    pub fn backspace_at(&mut self, now: Instant) {
        let mut code = self.field.value().to_owned();
        if code.pop().is_some() {
            self.field.input_at(code, now);
        }
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<ValidationRequest> {
        self.field.tick_at(now)
    }

    pub fn tick(&mut self) -> Option<ValidationRequest> {
        self.field.tick()
    }

    pub fn complete_at(
        &mut self,
        attempt: AttemptId,
        outcome: ValidatorOutcome,
        now: Instant,
    ) -> Resolution {
        self.field.complete_at(attempt, outcome, now)
    }

    /// Verify the same code again.
    pub fn retry_at(&mut self, now: Instant) -> Result<Option<ValidationRequest>, RetryError> {
        self.field.retry_at(now)
    }

    /// Verifications left before [`RetryError::Exhausted`].
    #[must_use]
    pub fn remaining_retries(&self) -> u32 {
        self.field
            .config()
            .max_retries
            .saturating_sub(self.field.state().retry_count())
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

    /// The sanitized code.
    #[must_use]
    pub fn value(&self) -> &str {
        self.field.value()
    }

    /// One slot per code position, for rendering individual boxes.
    #[must_use]
    pub fn slots(&self) -> Vec<Option<char>> {
        let mut chars = self.field.value().chars();
        (0..self.options.length).map(|_| chars.next()).collect()
    }

    /// Whether every position is filled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_complete_code(self.field.value())
    }

    fn is_complete_code(&self, code: &str) -> bool {
        self.options.length > 0 && code.chars().count() == self.options.length
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
    pub fn options(&self) -> &OtpOptions {
        &self.options
    }

    #[must_use]
    pub fn field(&self) -> &FieldValidator {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut FieldValidator {
        &mut self.field
    }
}
